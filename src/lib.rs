//! Build-time synthesis of guard clauses and invalid-check predicates from
//! rule annotations on fields and parameters.
//!
//! A round reads a [`host::ProgramHost`], classifies its methods, registers
//! rule-bearing types, installs the blank helper and predicates, and finally
//! rewrites eligible method bodies. See [`processor::Processor`].

pub mod builder;
pub mod codegen;
pub mod config;
pub mod diag;
pub mod eligibility;
pub mod error;
pub mod guard;
pub mod helper;
pub mod host;
pub mod input;
pub mod ir;
pub mod logging;
pub mod predicate;
pub mod processor;
pub mod registry;
pub mod regulation;
pub mod resolve;
pub mod rule;
pub mod tree;
pub mod typename;
