pub mod classifier_trait;
pub mod gbdt;

pub use classifier_trait::ClassifierModel;
pub use gbdt::GbdtBundle;
