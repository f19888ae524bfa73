// src/services/mod.rs

pub mod payroll;
