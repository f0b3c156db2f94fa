pub mod bar;
pub mod catalog;
pub mod series;
