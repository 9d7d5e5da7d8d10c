pub mod classifier_trait;
pub mod forest;
pub mod tree;

pub use classifier_trait::ClassifierModel;
pub use forest::RandomForest;
