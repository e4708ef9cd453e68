pub mod semi_naive;
pub mod spj_processor;
