pub mod calculation;
pub mod feedback_service;
pub mod recommendation;
pub mod sizing_service;
pub mod sunshine_service;
