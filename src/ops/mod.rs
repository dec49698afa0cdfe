pub mod check;
pub mod completion;
pub mod deadline;
pub mod editor;
pub mod hierarchy;
pub mod navigation;
pub mod tree_ops;
