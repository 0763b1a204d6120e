//! Generation stages.
//!
//! Each stage is one round trip to the model: plan, code, tests,
//! documentation, optimization, plus feedback refinement. Code-producing
//! stages run the fence extractor over the decoded response; an empty result
//! is a stage failure, never silently passed downstream.

use tracing::debug;

use crate::config::ModelConfig;
use crate::extract::extract_code;
use crate::language::LanguageSelection;
use crate::model::{ModelClient, ModelError};

const PLANNING_PROMPT: &str = "\
You are a highly skilled software development assistant. Your primary \
objective is to assist in planning a software development project.

User Query: {query}
Programming Languages: {languages}

The project plan should include the following essential components:

1. A clear and concise project objective: the purpose, goals, and \
deliverables of the project.
2. Detailed project steps: the tasks and milestones needed to achieve the \
objective.
3. Project considerations and prerequisites: critical factors, dependencies, \
or requirements that must be addressed first.

Please provide a detailed plan based on these specifications.
";

const CODE_PROMPT: &str = "\
Based on the provided project plan:
{plan}

Generate high-quality code in the following programming languages: \
{languages}. Ensure the code is:

* Clean and properly formatted
* Free from installation commands like 'pip install'
* Ready to execute without further modification

Dependencies should be handled separately and not included in the generated \
code. Always use real URLs for placeholders, as they may return actual \
answers during testing.
";

const TESTS_PROMPT: &str = "\
Based on the project plan:
{plan}

And the following code:
{code}

Generate comprehensive tests in the specified programming languages: \
{languages}. Ensure the tests are:

* Clean and properly formatted
* Free from installation commands like 'pip install'
* Ready to execute without further modification

Dependencies should be handled separately and not included in the generated \
tests.
";

const DOCUMENTATION_PROMPT: &str = "\
Based on the following code:
{code}

Generate high-quality documentation in the specified programming languages: \
{languages}. Ensure the documentation is:

* Clean and properly formatted
* Free from installation commands like 'pip install'
* Clear and easy to understand

The documented code should provide a comprehensive overview of the code, its \
functionality, and any relevant details. Return the full code with the \
documentation added.
";

const OPTIMIZATION_PROMPT: &str = "\
Based on the following code:
{code}

Optimize the provided code in the specified programming languages: \
{languages}. Ensure the optimized code is:

* Clean and properly formatted
* Free from installation commands like 'pip install'
* Efficient and easy to read

The optimized code should improve performance, reduce complexity, and \
enhance overall maintainability.
";

const REFINEMENT_PROMPT: &str = "\
The user has provided feedback on the generated code and tests. Here is the \
original code:
{code}

And here is the user's feedback:
{feedback}

Please refine the code based on this feedback, ensuring it is corrected and \
improved according to the user's suggestions. Ensure the refined code is:

* Clean and properly formatted
* Free from installation commands like 'pip install'
* Ready to execute without further modification
";

/// Which model name serves which stage.
#[derive(Debug, Clone)]
pub(crate) struct ModelRoles {
    /// Planning stage model.
    pub planner: String,
    /// Code-producing stage model.
    pub tool: String,
}

impl ModelRoles {
    /// Role assignment from configuration.
    pub fn from_config(config: &ModelConfig) -> Self {
        Self {
            planner: config.name.clone(),
            tool: config.tool_name.clone(),
        }
    }
}

/// The five generation stages plus feedback refinement, over one client.
pub(crate) struct Stages<'a> {
    model: &'a dyn ModelClient,
    roles: ModelRoles,
}

impl<'a> Stages<'a> {
    /// Binds the stages to a client and role assignment.
    pub fn new(model: &'a dyn ModelClient, roles: ModelRoles) -> Self {
        Self { model, roles }
    }

    /// Planning stage: free text, no extraction.
    pub async fn plan(
        &self,
        query: &str,
        languages: &LanguageSelection,
    ) -> Result<String, ModelError> {
        let prompt = fill(
            PLANNING_PROMPT,
            &[("query", query), ("languages", &languages.join())],
        );
        let text = self.model.complete(&self.roles.planner, &prompt).await?;
        if text.trim().is_empty() {
            return Err(ModelError::EmptyResponse);
        }
        debug!("Generated plan ({} bytes)", text.len());
        Ok(text)
    }

    /// Code generation from the (possibly annotated) plan.
    pub async fn code(
        &self,
        plan: &str,
        languages: &LanguageSelection,
    ) -> Result<String, ModelError> {
        let prompt = fill(
            CODE_PROMPT,
            &[("plan", plan), ("languages", &languages.join())],
        );
        self.complete_code(&prompt).await
    }

    /// Test generation from the plan and current code.
    pub async fn tests(
        &self,
        plan: &str,
        code: &str,
        languages: &LanguageSelection,
    ) -> Result<String, ModelError> {
        let prompt = fill(
            TESTS_PROMPT,
            &[("plan", plan), ("code", code), ("languages", &languages.join())],
        );
        self.complete_code(&prompt).await
    }

    /// Documentation stage: returns the documented code.
    pub async fn document(
        &self,
        code: &str,
        languages: &LanguageSelection,
    ) -> Result<String, ModelError> {
        let prompt = fill(
            DOCUMENTATION_PROMPT,
            &[("code", code), ("languages", &languages.join())],
        );
        self.complete_code(&prompt).await
    }

    /// Optimization stage: returns the optimized code.
    pub async fn optimize(
        &self,
        code: &str,
        languages: &LanguageSelection,
    ) -> Result<String, ModelError> {
        let prompt = fill(
            OPTIMIZATION_PROMPT,
            &[("code", code), ("languages", &languages.join())],
        );
        self.complete_code(&prompt).await
    }

    /// Refinement of the code against user feedback.
    pub async fn refine(
        &self,
        code: &str,
        feedback: &str,
        languages: &LanguageSelection,
    ) -> Result<String, ModelError> {
        let prompt = fill(
            REFINEMENT_PROMPT,
            &[
                ("code", code),
                ("feedback", feedback),
                ("languages", &languages.join()),
            ],
        );
        self.complete_code(&prompt).await
    }

    /// Round trip on the tool model followed by fence extraction.
    async fn complete_code(&self, prompt: &str) -> Result<String, ModelError> {
        let text = self.model.complete(&self.roles.tool, prompt).await?;
        let code = extract_code(&text);
        if code.trim().is_empty() {
            return Err(ModelError::EmptyResponse);
        }
        Ok(code)
    }
}

/// Replaces `{key}` placeholders in a template.
fn fill(template: &str, pairs: &[(&str, &str)]) -> String {
    let mut out = template.to_string();
    for (key, value) in pairs {
        out = out.replace(&format!("{{{key}}}"), value);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::Language;
    use crate::model::mock::MockModelClient;

    fn roles() -> ModelRoles {
        ModelRoles {
            planner: "plan-model".to_string(),
            tool: "tool-model".to_string(),
        }
    }

    fn python() -> LanguageSelection {
        LanguageSelection::single(Language::Python)
    }

    #[test]
    fn test_fill_replaces_all_placeholders() {
        let out = fill("a={a} b={b} a={a}", &[("a", "1"), ("b", "2")]);
        assert_eq!(out, "a=1 b=2 a=1");
    }

    #[test]
    fn test_fill_leaves_unknown_placeholders() {
        let out = fill("x={x}", &[("y", "2")]);
        assert_eq!(out, "x={x}");
    }

    #[test]
    fn test_roles_from_config() {
        let config = ModelConfig {
            name: "planner".to_string(),
            tool_name: "worker".to_string(),
            ..ModelConfig::default()
        };
        let roles = ModelRoles::from_config(&config);
        assert_eq!(roles.planner, "planner");
        assert_eq!(roles.tool, "worker");
    }

    #[tokio::test]
    async fn test_plan_returns_raw_text() {
        let client = MockModelClient::always_succeed("1. do the thing");
        let stages = Stages::new(&client, roles());
        let plan = stages.plan("reverse a string", &python()).await.unwrap();
        assert_eq!(plan, "1. do the thing");
    }

    #[tokio::test]
    async fn test_empty_plan_is_an_error() {
        let client = MockModelClient::always_succeed("   \n");
        let stages = Stages::new(&client, roles());
        let result = stages.plan("q", &python()).await;
        assert!(matches!(result, Err(ModelError::EmptyResponse)));
    }

    #[tokio::test]
    async fn test_code_extracts_fenced_block() {
        let client =
            MockModelClient::always_succeed("Sure!\n```python\nprint(1)\n```\nEnjoy.");
        let stages = Stages::new(&client, roles());
        let code = stages.code("the plan", &python()).await.unwrap();
        assert_eq!(code, "print(1)");
    }

    #[tokio::test]
    async fn test_code_without_fences_is_an_error() {
        let client = MockModelClient::always_succeed("prose with no code block");
        let stages = Stages::new(&client, roles());
        let result = stages.code("the plan", &python()).await;
        assert!(matches!(result, Err(ModelError::EmptyResponse)));
    }

    #[tokio::test]
    async fn test_model_failure_propagates() {
        let client = MockModelClient::always_fail("connection refused");
        let stages = Stages::new(&client, roles());
        let result = stages.tests("plan", "code", &python()).await;
        assert!(matches!(result, Err(ModelError::RetriesExhausted { .. })));
    }

    #[tokio::test]
    async fn test_each_stage_is_one_round_trip() {
        let client = MockModelClient::always_succeed("```\nx\n```");
        let stages = Stages::new(&client, roles());

        stages.code("p", &python()).await.unwrap();
        stages.tests("p", "c", &python()).await.unwrap();
        stages.document("c", &python()).await.unwrap();
        stages.optimize("c", &python()).await.unwrap();
        stages.refine("c", "f", &python()).await.unwrap();

        assert_eq!(client.invocation_count(), 5);
    }
}
