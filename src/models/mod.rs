// src/models/mod.rs

pub mod exam_record;
pub mod question;
pub mod resource;
pub mod teacher;
pub mod user;
