mod codec;
mod compare;
mod filter;
mod model;
mod population;
pub mod testlab;
mod validate;

pub use codec::{
    decode_bundle, decode_envelope, decode_object, decode_resource, encode_pretty,
    peek_type, Bundle, Envelope,
};
pub use compare::{
    compare_objects, CompareDepth, CompareOutcome, Comparison, StructuralCompare,
};
pub use filter::{
    evaluate, evaluate_in, FilterExpression, Selection, VersionKeyword, VersionSelector,
    MATCH_ID_PARAM, MATCH_TYPE_PARAM, MATCH_VERSION_PARAM,
};
pub use model::{
    ApiRoot, AttackPattern, Campaign, CollectionResource, Collections, CommonProperties,
    Discovery, ExternalReference, Indicator, KillChainPhase, StixObject, ThreatActor, Timestamp,
};
pub use population::{AccessScope, CollectionFixture, ReferencePopulation, VersionedIdentity};
pub use validate::{
    validate_objects, ItemVerdict, MatchStrategy, ValidationOptions, ValidationReport,
};

#[derive(Debug, Clone, thiserror::Error, Eq, PartialEq)]
pub enum CoreError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("filter error: {0}")]
    Filter(String),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("encode error: {0}")]
    Encode(String),
}
