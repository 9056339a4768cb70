pub mod identifier;
pub mod patient;

pub use identifier::{next_identifier, IdentifierError, VisibleId};
pub use patient::{find_patient, insert_patient, mint_visible_id, PatientService};
