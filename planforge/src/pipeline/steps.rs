//! The fixed step table.
//!
//! Each [`StepId`] resolves to a [`PipelineStepDefinition`] by matching on
//! the closed enum, so adding a step is a compile-checked table edit.

use crate::contracts::{FieldKind, SchemaContract};
use crate::core::StepId;

/// Static description of one pipeline step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineStepDefinition {
    /// Step id.
    pub id: StepId,
    /// Agent role name.
    pub role: &'static str,
    /// What the agent is asked to produce.
    pub instruction: &'static str,
    /// Steps that must have succeeded first.
    pub dependencies: &'static [StepId],
    /// Contract for the step's content.
    pub contract: SchemaContract,
}

impl PipelineStepDefinition {
    /// Creates a definition with an empty contract.
    #[must_use]
    pub fn new(id: StepId, role: &'static str, dependencies: &'static [StepId]) -> Self {
        Self {
            id,
            role,
            instruction: "",
            dependencies,
            contract: SchemaContract::new(id.as_str()),
        }
    }

    /// Replaces the contract.
    #[must_use]
    pub fn with_contract(mut self, contract: SchemaContract) -> Self {
        self.contract = contract;
        self
    }

    /// Replaces the instruction.
    #[must_use]
    pub const fn with_instruction(mut self, instruction: &'static str) -> Self {
        self.instruction = instruction;
        self
    }
}

impl StepId {
    /// Returns this step's table entry.
    #[must_use]
    pub fn definition(self) -> PipelineStepDefinition {
        use StepId::{Architecture, Implementation, Infrastructure, Requirements, Security, Ui, Verification};

        let contract = SchemaContract::new(self.as_str());
        let (role, instruction, dependencies, contract): (_, _, &'static [StepId], _) = match self {
            Requirements => (
                "Product Analyst",
                "Derive user stories and functional requirements from the request.",
                &[],
                contract
                    .required("user_stories", FieldKind::Array)
                    .required("functional_requirements", FieldKind::Array)
                    .optional("non_functional_requirements", FieldKind::Array),
            ),
            Architecture => (
                "Software Architect",
                "Design the system components, their responsibilities and interactions.",
                &[Requirements],
                contract
                    .required("components", FieldKind::Array)
                    .optional("apis", FieldKind::Array)
                    .optional("data_models", FieldKind::Array),
            ),
            Security => (
                "Security Engineer",
                "Model threats against the architecture and propose mitigations.",
                &[Requirements, Architecture],
                contract
                    .required("threats", FieldKind::Array)
                    .optional("controls", FieldKind::Array),
            ),
            Infrastructure => (
                "DevOps Engineer",
                "Plan the deployment topology and infrastructure services.",
                &[Architecture, Security],
                contract
                    .required("services", FieldKind::Array)
                    .optional("environments", FieldKind::Array),
            ),
            Ui => (
                "UX Designer",
                "Define the screens and navigation of the user interface.",
                &[Requirements, Architecture],
                contract
                    .required("screens", FieldKind::Array)
                    .optional("navigation", FieldKind::Object),
            ),
            Implementation => (
                "Tech Lead",
                "Break the work into ordered implementation tasks.",
                &[Requirements, Architecture, Ui],
                contract
                    .required("tasks", FieldKind::Array)
                    .optional("milestones", FieldKind::Array),
            ),
            Verification => (
                "QA Engineer",
                "Write test cases that verify the requirements are implemented.",
                &[Requirements, Implementation],
                contract
                    .required("test_cases", FieldKind::Array)
                    .optional("coverage", FieldKind::Object),
            ),
        };

        PipelineStepDefinition::new(self, role, dependencies)
            .with_instruction(instruction)
            .with_contract(contract)
    }
}

/// The full table, in execution order.
#[must_use]
pub fn default_steps() -> Vec<PipelineStepDefinition> {
    StepId::ALL.into_iter().map(StepId::definition).collect()
}
