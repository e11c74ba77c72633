//! # Package and Service Selection
//!
//! Walks the user from a loaded [`DefinitionTree`] to the single service the session will talk
//! to: first a package prompt, then a service prompt.
//!
//! Prompting itself is delegated to a [`Chooser`], so the same protocol drives the terminal
//! prompts of the CLI, preset answers given on the command line, and scripted tests.
//!
//! Two shapes need special care:
//!
//! * **Definitions without a package.** Their services and types sit directly at the root, so
//!   the package prompt offers services and messages. Picking any of them falls back to the
//!   whole root as the service map, named after the definition file.
//! * **Dotted packages.** `acme.billing.v1` is stored as nested packages. While the chosen
//!   package has sub-packages holding services, the selector keeps prompting with their dotted
//!   names (`acme.billing`), listing the package itself first when it has services of its own.
use crate::definition::{DefinitionTree, Member, Package, ServiceDefinition};
use std::path::Path;

const PACKAGE_MESSAGE: &str = "What package you want to use?";
const SERVICE_MESSAGE: &str = "What service you want to use?";

/// What a prompt is asking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChoiceKind {
    Package,
    Service,
}

/// A single-choice prompt.
#[derive(Debug, Clone, Copy)]
pub struct Choice<'a> {
    pub kind: ChoiceKind,
    pub message: &'a str,
    /// Candidates in display order.
    pub options: &'a [String],
}

#[derive(Debug, thiserror::Error)]
pub enum PromptError {
    #[error("Prompt interrupted")]
    Interrupted,
    #[error("'{0}' is not one of the available choices")]
    UnknownChoice(String),
    #[error("Prompt failed: {0}")]
    Failed(String),
}

/// Something able to answer single-choice prompts.
pub trait Chooser {
    /// Blocks until one of `choice.options` is picked and returns its index.
    fn choose(&mut self, choice: Choice<'_>) -> Result<usize, PromptError>;
}

#[derive(Debug, thiserror::Error)]
pub enum SelectError {
    #[error("Unable to find a package in {file}")]
    UnresolvedPackage { file: String },
    #[error("No service found in package '{package}'")]
    NoServiceFound { package: String },
    #[error(transparent)]
    Prompt(#[from] PromptError),
}

/// The outcome of the whole selection protocol.
#[derive(Debug, Clone)]
pub struct Selection {
    pub package: String,
    pub service_name: String,
    pub service: ServiceDefinition,
}

/// Runs the package prompt followed by the service prompt.
pub fn select<C>(
    tree: &DefinitionTree,
    definition: &Path,
    chooser: &mut C,
) -> Result<Selection, SelectError>
where
    C: Chooser + ?Sized,
{
    let (package_name, package) = choose_package(tree, definition, chooser)?;
    let (service_name, service) = choose_service(&package_name, package, chooser)?;

    tracing::debug!(package = %package_name, service = %service_name, "service selected");

    Ok(Selection {
        package: package_name,
        service_name,
        service,
    })
}

/// Prompts for one of the root names of `tree` and resolves it to a service map.
///
/// Returns the display name of the package together with the package itself.
pub fn choose_package<'a, C>(
    tree: &'a DefinitionTree,
    definition: &Path,
    chooser: &mut C,
) -> Result<(String, &'a Package), SelectError>
where
    C: Chooser + ?Sized,
{
    let unresolved = || SelectError::UnresolvedPackage {
        file: definition.display().to_string(),
    };

    let names = tree.root().names();
    if names.is_empty() {
        return Err(unresolved());
    }

    let chosen = prompt(chooser, ChoiceKind::Package, PACKAGE_MESSAGE, &names)?;

    match tree.root().get(&chosen) {
        Some(member) if member.is_constructible() => {
            Ok((package_display_name(definition), tree.root()))
        }
        Some(Member::Package(package)) => descend(chosen, package, chooser),
        _ => Err(unresolved()),
    }
}

/// Prompts for one of the services of `package`.
///
/// Sub-packages, messages and enums are never offered.
pub fn choose_service<C>(
    package_name: &str,
    package: &Package,
    chooser: &mut C,
) -> Result<(String, ServiceDefinition), SelectError>
where
    C: Chooser + ?Sized,
{
    let names: Vec<String> = package
        .services()
        .map(|(name, _)| name.to_string())
        .collect();

    if names.is_empty() {
        return Err(SelectError::NoServiceFound {
            package: package_name.to_string(),
        });
    }

    let chosen = prompt(chooser, ChoiceKind::Service, SERVICE_MESSAGE, &names)?;

    let service = package
        .get(&chosen)
        .and_then(Member::as_service)
        .cloned()
        .ok_or_else(|| SelectError::NoServiceFound {
            package: package_name.to_string(),
        })?;

    Ok((chosen, service))
}

/// The name used for definitions without a package: the last segment of the definition path.
pub fn package_display_name(definition: &Path) -> String {
    definition
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| definition.display().to_string())
}

fn descend<'a, C>(
    mut name: String,
    mut package: &'a Package,
    chooser: &mut C,
) -> Result<(String, &'a Package), SelectError>
where
    C: Chooser + ?Sized,
{
    loop {
        let subs: Vec<(String, &'a Package)> = package
            .sub_packages()
            .filter(|(_, sub)| sub.has_services())
            .map(|(sub_name, sub)| (format!("{name}.{sub_name}"), sub))
            .collect();

        if subs.is_empty() {
            return Ok((name, package));
        }

        let own_services = package.services().next().is_some();
        let options: Vec<String> = own_services
            .then(|| name.clone())
            .into_iter()
            .chain(subs.iter().map(|(sub_name, _)| sub_name.clone()))
            .collect();

        let chosen = prompt(chooser, ChoiceKind::Package, PACKAGE_MESSAGE, &options)?;
        if chosen == name {
            return Ok((name, package));
        }

        package = subs
            .into_iter()
            .find(|(sub_name, _)| *sub_name == chosen)
            .map(|(_, sub)| sub)
            .ok_or_else(|| PromptError::UnknownChoice(chosen.clone()))?;
        name = chosen;
    }
}

fn prompt<C>(
    chooser: &mut C,
    kind: ChoiceKind,
    message: &str,
    options: &[String],
) -> Result<String, SelectError>
where
    C: Chooser + ?Sized,
{
    let index = chooser.choose(Choice {
        kind,
        message,
        options,
    })?;

    options
        .get(index)
        .cloned()
        .ok_or_else(|| PromptError::UnknownChoice(index.to_string()).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::load;
    use std::collections::VecDeque;

    const FIXTURES: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures");

    /// Answers prompts by name and records every prompt it was shown.
    #[derive(Default)]
    struct ScriptedChooser {
        answers: VecDeque<String>,
        shown: Vec<(ChoiceKind, Vec<String>)>,
    }

    impl ScriptedChooser {
        fn new(answers: &[&str]) -> Self {
            Self {
                answers: answers.iter().map(|a| a.to_string()).collect(),
                shown: Vec::new(),
            }
        }
    }

    impl Chooser for ScriptedChooser {
        fn choose(&mut self, choice: Choice<'_>) -> Result<usize, PromptError> {
            self.shown.push((choice.kind, choice.options.to_vec()));
            let answer = self.answers.pop_front().ok_or(PromptError::Interrupted)?;
            choice
                .options
                .iter()
                .position(|o| *o == answer)
                .ok_or(PromptError::UnknownChoice(answer))
        }
    }

    fn fixture(name: &str) -> DefinitionTree {
        load(Path::new(name), Path::new(FIXTURES)).unwrap()
    }

    #[test]
    fn picks_package_then_service() {
        let tree = fixture("users.proto");
        let mut chooser = ScriptedChooser::new(&["users", "AdminService"]);

        let selection = select(&tree, Path::new("users.proto"), &mut chooser).unwrap();

        assert_eq!(selection.package, "users");
        assert_eq!(selection.service_name, "AdminService");
        assert_eq!(selection.service.full_name(), "users.AdminService");
        assert_eq!(chooser.shown[0], (ChoiceKind::Package, vec!["users".into()]));
    }

    #[test]
    fn service_prompt_only_offers_services() {
        let tree = fixture("users.proto");
        let mut chooser = ScriptedChooser::new(&["users", "UserService"]);

        select(&tree, Path::new("users.proto"), &mut chooser).unwrap();

        assert_eq!(
            chooser.shown[1],
            (
                ChoiceKind::Service,
                vec!["UserService".into(), "AdminService".into()]
            )
        );
    }

    #[test]
    fn every_service_is_reachable() {
        let tree = fixture("nested.proto");
        let expected = [
            (&["users", "UserService"][..], "users.UserService"),
            (&["users", "AdminService"][..], "users.AdminService"),
            (
                &["acme", "acme.billing", "acme.billing.v1", "InvoiceService"][..],
                "acme.billing.v1.InvoiceService",
            ),
        ];

        for (answers, full_name) in expected {
            let mut chooser = ScriptedChooser::new(answers);
            let selection = select(&tree, Path::new("nested.proto"), &mut chooser).unwrap();
            assert_eq!(selection.service.full_name(), full_name);
        }
    }

    #[test]
    fn dotted_packages_are_walked_segment_by_segment() {
        let tree = fixture("nested.proto");
        let mut chooser = ScriptedChooser::new(&["acme", "acme.billing", "acme.billing.v1"]);

        let (name, package) =
            choose_package(&tree, Path::new("nested.proto"), &mut chooser).unwrap();

        assert_eq!(name, "acme.billing.v1");
        assert_eq!(package.names(), vec!["InvoiceService", "InvoiceRequest"]);
        assert_eq!(
            chooser.shown[1..],
            [
                (ChoiceKind::Package, vec!["acme.billing".into()]),
                (ChoiceKind::Package, vec!["acme.billing.v1".into()]),
            ]
        );
    }

    #[test]
    fn packages_with_services_still_offer_nested_packages() {
        let tree = fixture("layered.proto");

        let mut chooser = ScriptedChooser::new(&["acme", "acme", "Top"]);
        let top = select(&tree, Path::new("layered.proto"), &mut chooser).unwrap();

        assert_eq!(top.package, "acme");
        assert_eq!(top.service.full_name(), "acme.Top");
        assert_eq!(
            chooser.shown,
            vec![
                (ChoiceKind::Package, vec!["acme".into()]),
                (ChoiceKind::Package, vec!["acme".into(), "acme.v1".into()]),
                (ChoiceKind::Service, vec!["Top".into()]),
            ]
        );

        let mut chooser = ScriptedChooser::new(&["acme", "acme.v1", "Deep"]);
        let deep = select(&tree, Path::new("layered.proto"), &mut chooser).unwrap();

        assert_eq!(deep.package, "acme.v1");
        assert_eq!(deep.service.full_name(), "acme.v1.Deep");
    }

    #[test]
    fn packages_without_services_are_not_offered_for_descent() {
        let tree = fixture("users.proto");
        let mut chooser = ScriptedChooser::new(&["users", "UserService"]);

        select(&tree, Path::new("users.proto"), &mut chooser).unwrap();

        // No sub-package prompt between the package and the service prompt.
        assert_eq!(chooser.shown[1].0, ChoiceKind::Service);
    }

    #[test]
    fn packageless_definitions_fall_back_to_the_whole_tree() {
        let tree = fixture("flat.proto");
        let mut chooser = ScriptedChooser::new(&["HelloRequest", "Greeter"]);

        let selection = select(&tree, Path::new("protos/flat.proto"), &mut chooser).unwrap();

        assert_eq!(selection.package, "flat.proto");
        assert_eq!(selection.service_name, "Greeter");
        // The service prompt runs on the root, filtered down to services.
        assert_eq!(
            chooser.shown[1],
            (ChoiceKind::Service, vec!["Greeter".into()])
        );
    }

    #[test]
    fn picking_a_root_service_falls_back_to_the_whole_tree() {
        let tree = fixture("flat.proto");
        let mut chooser = ScriptedChooser::new(&["Greeter", "Greeter"]);

        let selection = select(&tree, Path::new("flat.proto"), &mut chooser).unwrap();

        assert_eq!(selection.package, "flat.proto");
        assert_eq!(selection.service.full_name(), "Greeter");
        assert_eq!(
            chooser.shown[0],
            (
                ChoiceKind::Package,
                vec![
                    "Greeter".into(),
                    "HelloRequest".into(),
                    "HelloReply".into(),
                    "Mood".into()
                ]
            )
        );
    }

    #[test]
    fn display_name_is_the_last_path_segment() {
        assert_eq!(package_display_name(Path::new("/a/b/my.proto")), "my.proto");
        assert_eq!(package_display_name(Path::new("my.proto")), "my.proto");
    }

    #[test]
    fn packages_without_services_are_reported() {
        let tree = fixture("models.proto");
        let mut chooser = ScriptedChooser::new(&["models"]);

        let err = select(&tree, Path::new("models.proto"), &mut chooser).unwrap_err();

        assert!(matches!(err, SelectError::NoServiceFound { package } if package == "models"));
    }

    #[test]
    fn empty_definitions_have_no_package() {
        let tree = DefinitionTree::default();
        let mut chooser = ScriptedChooser::default();

        let err = select(&tree, Path::new("empty.proto"), &mut chooser).unwrap_err();

        assert!(matches!(err, SelectError::UnresolvedPackage { file } if file == "empty.proto"));
        assert!(chooser.shown.is_empty());
    }

    #[test]
    fn prompt_failures_propagate() {
        let tree = fixture("users.proto");
        let mut chooser = ScriptedChooser::default();

        let err = select(&tree, Path::new("users.proto"), &mut chooser).unwrap_err();

        assert!(matches!(err, SelectError::Prompt(PromptError::Interrupted)));
    }

    #[test]
    fn out_of_range_answers_are_rejected() {
        struct Overshoot;
        impl Chooser for Overshoot {
            fn choose(&mut self, choice: Choice<'_>) -> Result<usize, PromptError> {
                Ok(choice.options.len())
            }
        }

        let tree = fixture("users.proto");
        let err = select(&tree, Path::new("users.proto"), &mut Overshoot).unwrap_err();

        assert!(matches!(err, SelectError::Prompt(PromptError::UnknownChoice(_))));
    }
}
