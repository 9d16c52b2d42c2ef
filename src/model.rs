pub mod bus_stop;
pub mod db_model;
pub mod nus_api_model;
pub mod public_model;
pub mod reconciliation;
