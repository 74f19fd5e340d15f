//! Request builder: expands the benchmark cross-product.

use tracing::debug;

use crate::batch::{GenerationRequest, PromptStrategy};
use crate::error::PromptError;
use crate::problems::Problem;

use super::persona::PersonaLibrary;
use super::template::PromptLibrary;

/// Expands problems × strategies × templates × models into an ordered
/// request sequence.
///
/// Iteration nesting is fixed and documented: problems outermost, then
/// strategies (enum declaration order), then templates within a strategy
/// (name order), then models innermost. The coordinator's
/// index-correspondence contract is measured against exactly this order.
pub struct RequestBuilder<'a> {
    library: &'a PromptLibrary,
    personas: &'a PersonaLibrary,
    models: Vec<String>,
}

impl<'a> RequestBuilder<'a> {
    /// Creates a builder over a prompt library and model list.
    ///
    /// Model order is preserved as given; callers wanting reproducible
    /// request sequences pass a stable list.
    pub fn new(
        library: &'a PromptLibrary,
        personas: &'a PersonaLibrary,
        models: Vec<String>,
    ) -> Self {
        Self {
            library,
            personas,
            models,
        }
    }

    /// Builds the full request cross-product for the given problems.
    ///
    /// Templates that name a persona get the profile preamble prefixed to
    /// the rendered prompt; an unknown persona name is a build error, not
    /// a per-request failure, because it is a library-authoring mistake.
    pub fn build(&self, problems: &[Problem]) -> Result<Vec<GenerationRequest>, PromptError> {
        let mut requests = Vec::new();

        for problem in problems {
            let context = problem.template_context();
            for strategy in self.library.strategies() {
                for template in self.library.templates_for(strategy) {
                    let mut prompt = self.library.render(&template.name, &context)?;

                    if let Some(persona_name) = &template.persona {
                        let profile = self.personas.get(persona_name).ok_or_else(|| {
                            PromptError::UnknownPersona {
                                template: template.name.clone(),
                                persona: persona_name.clone(),
                            }
                        })?;
                        prompt = profile.apply(&prompt);
                    }

                    for model in &self.models {
                        requests.push(GenerationRequest::new(
                            prompt.clone(),
                            strategy,
                            &problem.id,
                            model,
                        ));
                    }
                }
            }
        }

        debug!(
            problems = problems.len(),
            strategies = self.library.strategies().len(),
            models = self.models.len(),
            requests = requests.len(),
            "Built generation requests"
        );

        Ok(requests)
    }

    /// Strategies the built requests will cover.
    pub fn strategies(&self) -> Vec<PromptStrategy> {
        self.library.strategies()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompts::template::PromptTemplate;

    fn template(name: &str, strategy: PromptStrategy) -> PromptTemplate {
        PromptTemplate {
            name: name.to_string(),
            strategy,
            template: "Solve {{ problem_description }}".to_string(),
            variables: vec!["problem_description".to_string()],
            expected_tokens: 200,
            complexity_level: "simple".to_string(),
            persona: None,
        }
    }

    fn problem(id: &str) -> Problem {
        Problem {
            id: id.to_string(),
            title: String::new(),
            description: format!("problem {}", id),
            constraints: String::new(),
            example_input: String::new(),
            example_output: String::new(),
            test_cases: vec![],
            canonical_solution: None,
        }
    }

    #[test]
    fn cross_product_nesting_order() {
        let library = PromptLibrary::from_templates(vec![
            template("b-zero", PromptStrategy::ZeroShot),
            template("a-zero", PromptStrategy::ZeroShot),
            template("cot", PromptStrategy::ChainOfThought),
        ])
        .unwrap();
        let personas = PersonaLibrary::default();
        let builder = RequestBuilder::new(
            &library,
            &personas,
            vec!["m1".to_string(), "m2".to_string()],
        );

        let requests = builder
            .build(&[problem("pb-1"), problem("pb-2")])
            .unwrap();

        // 2 problems x (2 zero_shot templates + 1 cot template) x 2 models.
        assert_eq!(requests.len(), 12);

        // Problems outermost.
        assert!(requests[..6].iter().all(|r| r.problem_id == "pb-1"));
        assert!(requests[6..].iter().all(|r| r.problem_id == "pb-2"));

        // Strategies in declaration order, templates name-sorted within,
        // models innermost.
        let head: Vec<(PromptStrategy, &str)> = requests[..6]
            .iter()
            .map(|r| (r.strategy, r.model_name.as_str()))
            .collect();
        assert_eq!(
            head,
            vec![
                (PromptStrategy::ZeroShot, "m1"),
                (PromptStrategy::ZeroShot, "m2"),
                (PromptStrategy::ZeroShot, "m1"),
                (PromptStrategy::ZeroShot, "m2"),
                (PromptStrategy::ChainOfThought, "m1"),
                (PromptStrategy::ChainOfThought, "m2"),
            ]
        );
    }

    #[test]
    fn persona_preamble_applied_to_opted_in_templates() {
        let mut persona_template = template("with-persona", PromptStrategy::Persona);
        persona_template.persona = Some("security_specialist".to_string());

        let library = PromptLibrary::from_templates(vec![persona_template]).unwrap();
        let personas = PersonaLibrary::default();
        let builder = RequestBuilder::new(&library, &personas, vec!["m".to_string()]);

        let requests = builder.build(&[problem("pb-1")]).unwrap();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].prompt.starts_with("You are a security-conscious"));
        assert!(requests[0].prompt.contains("Solve problem pb-1"));
    }

    #[test]
    fn unknown_persona_is_a_build_error() {
        let mut bad = template("bad", PromptStrategy::Persona);
        bad.persona = Some("ghost".to_string());

        let library = PromptLibrary::from_templates(vec![bad]).unwrap();
        let personas = PersonaLibrary::default();
        let builder = RequestBuilder::new(&library, &personas, vec!["m".to_string()]);

        let err = builder.build(&[problem("pb-1")]).unwrap_err();
        assert!(matches!(err, PromptError::UnknownPersona { .. }));
    }

    #[test]
    fn empty_problem_list_builds_no_requests() {
        let library =
            PromptLibrary::from_templates(vec![template("z", PromptStrategy::ZeroShot)]).unwrap();
        let personas = PersonaLibrary::default();
        let builder = RequestBuilder::new(&library, &personas, vec!["m".to_string()]);
        assert!(builder.build(&[]).unwrap().is_empty());
    }
}
