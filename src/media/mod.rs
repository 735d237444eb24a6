pub mod alass;
