//! User profile model: core identity, life domains and micro-modules.

pub mod core_profile;
pub mod domains;
pub mod micro_modules;

pub use core_profile::{
    clamp_score, merge_core_profile, normalize_big_five, union_ordered, Behavior, BigFive,
    CoreProfile, CoreProfileUpdate, Identity, LifeContext, Metacognition, RawBigFive,
};
pub use domains::{
    active_domains, default_domain_states, detect_domains, upsert_domain_signals, DetectedDomain,
    Domain, DomainSignal, DomainState, DomainStates, ACTIVATION_THRESHOLD, KEYWORD_SIGNAL_WEIGHT,
};
pub use micro_modules::{
    detect_micro_modules, find_module, module_templates, ActivationState, MicroModule,
    MicroModuleActivation, ModuleState, ENGAGEMENT_MEMORY_MODULE, MISSIONS_MODULE,
    ZEIGARNIK_MODULE,
};
