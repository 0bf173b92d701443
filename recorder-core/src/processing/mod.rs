pub mod mixer;
pub mod wav;
