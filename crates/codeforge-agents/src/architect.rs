//! `Architect.create_architecture(requirements) → ArchitecturalPlan`:
//! asks the model for a component breakdown and file layout before any
//! code is written.

use async_trait::async_trait;
use codeforge_artifact::{AgentKind, ArchitecturalPlan, ArtifactParser};
use codeforge_llm::{LlmError, LlmInvocation, LlmResult};

use crate::context::AgentContext;
use crate::role::Role;

const SYSTEM_PROMPT: &str = "You are the Architect agent in a multi-agent code generation pipeline. \
Decompose the requirements into exactly 3 components. All classes belong in the entry file; \
helper files only import from the entry file; never duplicate a class across files. \
Return only JSON matching the ArchitecturalPlan schema, no prose.";

pub struct Architect {
    ctx: AgentContext,
    parser: ArtifactParser,
}

impl Architect {
    pub fn new(ctx: AgentContext) -> Self {
        Architect { ctx, parser: ArtifactParser::new() }
    }

    pub async fn create_architecture(&self, requirements: &str) -> Result<ArchitecturalPlan, LlmError> {
        let invocation = LlmInvocation::new(requirements).with_system(SYSTEM_PROMPT);
        let result = self.ctx.invoke_and_track(AgentKind::Architect, invocation, None).await?;
        let plan = self.parser.parse_architecture(&result.text, requirements);
        if plan.low_confidence {
            tracing::warn!("architect produced a low-confidence fallback plan");
        }
        Ok(plan)
    }
}

#[async_trait]
impl Role for Architect {
    fn kind(&self) -> AgentKind {
        AgentKind::Architect
    }

    async fn invoke(&self, invocation: LlmInvocation) -> Result<LlmResult, LlmError> {
        self.ctx.invoke_and_track(AgentKind::Architect, invocation, None).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait as at;
    use codeforge_llm::{LlmBackend, Usage};
    use codeforge_usage::UsageTracker;
    use std::sync::Arc;

    struct StubBackend(&'static str);

    #[at]
    impl LlmBackend for StubBackend {
        async fn send(&self, _invocation: LlmInvocation) -> Result<LlmResult, LlmError> {
            Ok(LlmResult { text: self.0.to_string(), usage: Usage::default() })
        }
    }

    #[tokio::test]
    async fn valid_json_produces_high_confidence_plan() {
        let dir = tempfile::tempdir().unwrap();
        let usage = Arc::new(UsageTracker::new(true, dir.path().join("usage.json")));
        let backend = Arc::new(StubBackend(
            r#"{"analysis": {"components": ["a","b","c"], "dependencies": [], "architecture_type": "cli", "complexity": "simple", "summary": "s"}, "file_structure": {"files": {"main.py": "entry"}, "entry_point": "main.py", "class_definitions": {}}}"#,
        ));
        let architect = Architect::new(AgentContext::new(backend, usage));
        let plan = architect.create_architecture("a calculator").await.unwrap();
        assert!(!plan.low_confidence);
        assert_eq!(plan.file_structure.entry_point, "main.py");
    }

    #[tokio::test]
    async fn garbage_response_falls_back_but_never_errors() {
        let dir = tempfile::tempdir().unwrap();
        let usage = Arc::new(UsageTracker::new(true, dir.path().join("usage.json")));
        let backend = Arc::new(StubBackend("I cannot help with that."));
        let architect = Architect::new(AgentContext::new(backend, usage));
        let plan = architect.create_architecture("a calculator").await.unwrap();
        assert!(plan.low_confidence);
    }
}
