pub mod ligand_search;
pub mod operon_service;
pub mod sensor_service;

pub use ligand_search::LigandSearchService;
pub use operon_service::{OperonContext, OperonError, OperonService};
pub use sensor_service::{SensorService, SensorServiceError};
