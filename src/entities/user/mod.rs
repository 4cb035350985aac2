pub mod local_user_entity;
