
pub mod bwt_builder;
pub mod bwt_converter;
pub mod correction;
pub mod fm_index;
pub mod high_error;
pub mod indexed_bit_vec;
pub mod parameters;
pub mod result_writer;
pub mod seed_finder;
pub mod string_util;
pub mod walk;
