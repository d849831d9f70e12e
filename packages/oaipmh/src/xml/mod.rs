//! XML navigation helpers over `roxmltree` documents.

mod utils;

pub use utils::{
    clark_name, element_children, find_child, find_children, fragment, get_text, is_element,
    oai_child, oai_child_text, oai_children, oai_children_text,
};
