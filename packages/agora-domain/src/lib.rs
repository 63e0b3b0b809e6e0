pub mod engagement;
pub mod features;
pub mod presentation;
pub mod similarity;
pub mod stats;
