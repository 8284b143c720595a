pub mod pages;
pub mod scans;
