// src/utils/mod.rs

pub mod access_link;
pub mod hash;
pub mod html;
pub mod jwt;
