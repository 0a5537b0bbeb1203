pub mod comment;
pub mod dead_letter_message;
pub mod nutritional_value;
pub mod rating;
pub mod recipe;
pub mod role;
pub mod role_permission;
pub mod user;
