// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Stepgraph and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Core data model: step schema and workflow documents.
//!
//! A document owns an ordered map of steps. Steps reference each other by id only; a reference
//! may point to a step that does not exist, which is reported by analysis rather than rejected.

pub mod document;
pub mod fixtures;
pub mod ids;
pub mod step;

pub use document::{
    validate_constant_key, validate_flow_id, validate_version, MetadataError, WorkflowDocument,
    DEFAULT_VERSION,
};
pub use ids::{FlowId, Id, IdError, MessageId, StepId};
pub use step::{
    CollectInformation, Condition, ConditionOperator, DecisionOption, DecisionPoint,
    EvaluateCondition, ExecuteAction, InputValidation, ProvideInstructions, Reference,
    ReferenceVia, References, ScalarValue, Step, StepConfig, StepKind, UnknownStepKind,
    ValidationKind,
};
