// Domain layer - Plain data shared by every other layer
pub mod outcome;
pub mod query;
pub mod series;
pub mod table;
