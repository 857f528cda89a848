//! `Coder.generate(plan) → CodePackage`. The happy path is one LLM call
//! returning a JSON map of every file; on parse failure it falls back
//! to one call per source file (coordination rules repeated in every
//! per-file prompt so each file stays consistent with the others). The
//! documentation file is generated deterministically from the plan
//! rather than by another LLM call, so a successful run still costs
//! exactly one Coder call.

use std::collections::BTreeMap;

use async_trait::async_trait;
use codeforge_artifact::{AgentKind, ArchitecturalPlan, ArtifactParser, CodePackage};
use codeforge_llm::{LlmError, LlmInvocation, LlmResult};

use crate::context::AgentContext;
use crate::role::Role;

const SYSTEM_PROMPT: &str = "You are the Coder agent. Generate complete, runnable source for every file in the plan. \
The entry file owns all classes; helper files only import from it; data-holder files only hold data. \
Never emit an `if __name__ == \"__main__\"` guard in the entry file — the test harness imports its symbols directly. \
Return only JSON mapping filename to full source text, no prose.";

pub struct Coder {
    ctx: AgentContext,
    parser: ArtifactParser,
}

impl Coder {
    pub fn new(ctx: AgentContext) -> Self {
        Coder { ctx, parser: ArtifactParser::new() }
    }

    pub async fn generate(&self, plan: &ArchitecturalPlan) -> Result<CodePackage, LlmError> {
        let expected: Vec<String> = plan.file_structure.files.keys().cloned().collect();
        let prompt = format!(
            "Requirements: {}\n\nFile plan:\n{}",
            plan.requirements,
            plan.file_structure
                .files
                .iter()
                .map(|(f, d)| format!("- {f}: {d}"))
                .collect::<Vec<_>>()
                .join("\n"),
        );

        let invocation = LlmInvocation::new(prompt).with_system(SYSTEM_PROMPT);
        let result = self.ctx.invoke_and_track(AgentKind::Coder, invocation, None).await?;
        let mut files = self.parser.parse_code_package(&result.text, &expected);

        let missing: Vec<String> = expected.iter().filter(|f| !files.contains_key(*f)).cloned().collect();
        if !missing.is_empty() {
            tracing::warn!(?missing, "coder falling back to per-file generation");
            for filename in &missing {
                let description = plan.file_structure.files.get(filename).cloned().unwrap_or_default();
                let per_file_source = self.generate_single_file(plan, filename, &description).await?;
                files.insert(filename.clone(), per_file_source);
            }
        }

        if !files.contains_key("README.md") {
            files.insert("README.md".to_string(), render_readme(plan));
        }

        let entry_point = plan.file_structure.entry_point.clone();
        Ok(CodePackage { files, architectural_plan: plan.clone(), entry_point })
    }

    async fn generate_single_file(
        &self,
        plan: &ArchitecturalPlan,
        filename: &str,
        description: &str,
    ) -> Result<String, LlmError> {
        let prompt = format!(
            "Generate the complete source for `{filename}` ({description}) as part of: {}\n\n\
             Coordination rules: the entry file (`{}`) owns all classes; helper files only import from it; \
             data-holder files only hold data. Return only the source for `{filename}`, in a single fenced code block.",
            plan.requirements, plan.file_structure.entry_point,
        );
        let invocation = LlmInvocation::new(prompt).with_system(SYSTEM_PROMPT);
        let result = self.ctx.invoke_and_track(AgentKind::Coder, invocation, None).await?;
        let recovered = self.parser.parse_code_package(&result.text, &[filename.to_string()]);
        Ok(recovered
            .get(filename)
            .cloned()
            .unwrap_or_else(|| result.text.clone()))
    }
}

fn render_readme(plan: &ArchitecturalPlan) -> String {
    let mut out = format!("# {}\n\n{}\n\n## Files\n", plan.analysis.summary, plan.requirements);
    for (filename, description) in &plan.file_structure.files {
        out.push_str(&format!("- `{filename}`: {description}\n"));
    }
    out
}

#[async_trait]
impl Role for Coder {
    fn kind(&self) -> AgentKind {
        AgentKind::Coder
    }

    async fn invoke(&self, invocation: LlmInvocation) -> Result<LlmResult, LlmError> {
        self.ctx.invoke_and_track(AgentKind::Coder, invocation, None).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait as at;
    use codeforge_artifact::{Analysis, ArchitectureType, Complexity, FileStructure};
    use codeforge_llm::{LlmBackend, Usage};
    use codeforge_usage::UsageTracker;
    use std::sync::Arc;

    fn plan() -> ArchitecturalPlan {
        let mut files = BTreeMap::new();
        files.insert("main.py".to_string(), "entry point".to_string());
        ArchitecturalPlan {
            requirements: "a calculator that adds two integers".to_string(),
            analysis: Analysis {
                components: vec!["main".to_string()],
                dependencies: vec![],
                architecture_type: ArchitectureType::Cli,
                complexity: Complexity::Simple,
                summary: "calculator".to_string(),
            },
            file_structure: FileStructure { files, entry_point: "main.py".to_string(), class_definitions: BTreeMap::new() },
            detailed_plan: BTreeMap::new(),
            timestamp: "t".to_string(),
            low_confidence: false,
        }
    }

    struct StubBackend(&'static str);

    #[at]
    impl LlmBackend for StubBackend {
        async fn send(&self, _invocation: LlmInvocation) -> Result<LlmResult, LlmError> {
            Ok(LlmResult { text: self.0.to_string(), usage: Usage::default() })
        }
    }

    #[tokio::test]
    async fn single_call_produces_entry_file_and_readme() {
        let dir = tempfile::tempdir().unwrap();
        let usage = Arc::new(UsageTracker::new(true, dir.path().join("usage.json")));
        let backend = Arc::new(StubBackend(
            "{\"files\": {\"main.py\": \"def add(a, b):\\n    return a + b\\n\"}}",
        ));
        let coder = Coder::new(AgentContext::new(backend, usage.clone()));
        let cp = coder.generate(&plan()).await.unwrap();
        assert!(cp.files.contains_key("main.py"));
        assert!(cp.files.contains_key("README.md"));
        assert!(!cp.files["main.py"].contains("__main__"));
        assert_eq!(usage.stats().call_count, 1);
    }
}
