// src/handlers/mod.rs

pub mod company;
pub mod employee;
pub mod general;
pub mod legal_parameter;
pub mod payroll;
