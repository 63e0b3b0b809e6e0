//! Labeling convention for the two-way split that separates
//! self-introduction ("présentation") threads from content threads.
//!
//! The mapping of cluster label 1 to the presentation side is a dataset
//! convention inherited from the source corpus; it is fixed here rather
//! than inferred from the data.

pub const PRESENTATION_CLUSTER_LABEL: i32 = 1;
pub const PRESENTATION_TYPE: &str = "présentation";
pub const OTHER_TYPE: &str = "autre";

pub fn is_presentation(label: i32) -> bool {
	label == PRESENTATION_CLUSTER_LABEL
}

pub fn type_label(label: i32) -> &'static str {
	if is_presentation(label) { PRESENTATION_TYPE } else { OTHER_TYPE }
}
