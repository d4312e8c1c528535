//! Trigger filter engine
//!
//! Decides from a change event whether a pipeline fires. This is what lets one
//! monorepo host many independently triggered pipelines: a project's pipeline
//! only fires for changes under its own directory on its own branch.
//!
//! Matching is case-sensitive and separator-exact. No normalization of `./`
//! or trailing slashes is applied. A pattern ending in `/*` matches every path
//! starting with the part before the `*`; nested sub-directories are included.
//! Any other pattern matches only the identical path.

use crate::domain::trigger::{ChangeEvent, MismatchReason, TriggerDecision, TriggerFilter};

/// Whether `event` fires a pipeline guarded by `filter`
pub fn should_fire(event: &ChangeEvent, filter: &TriggerFilter) -> bool {
    evaluate(event, filter).fires()
}

/// Evaluates `event` against `filter`, keeping the reason of a mismatch
pub fn evaluate(event: &ChangeEvent, filter: &TriggerFilter) -> TriggerDecision {
    if !filter.included_branches.contains(&event.branch) {
        return TriggerDecision::Mismatch {
            reason: MismatchReason::BranchExcluded,
        };
    }

    if event.changed_paths.is_empty() {
        return TriggerDecision::Mismatch {
            reason: MismatchReason::NoChangedPaths,
        };
    }

    let matched_paths: Vec<String> = event
        .changed_paths
        .iter()
        .filter(|path| {
            filter
                .included_path_prefixes
                .iter()
                .any(|pattern| path_matches(pattern, path))
        })
        .cloned()
        .collect();

    if matched_paths.is_empty() {
        TriggerDecision::Mismatch {
            reason: MismatchReason::NoPathMatched,
        }
    } else {
        TriggerDecision::Fire { matched_paths }
    }
}

/// Matches one changed path against one include pattern
pub fn path_matches(pattern: &str, path: &str) -> bool {
    match pattern.strip_suffix('*') {
        Some(prefix) => path.starts_with(prefix),
        None => pattern == path,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn foo_filter() -> TriggerFilter {
        TriggerFilter::for_project("lambda-project-foo", "main")
    }

    #[test]
    fn test_filter_for_project() {
        let filter = foo_filter();
        assert!(
            filter
                .included_path_prefixes
                .contains("projects/lambda-project-foo/*")
        );
        assert_eq!(filter.included_branches.len(), 1);
        assert!(filter.included_branches.contains("main"));
    }

    #[test]
    fn test_fires_on_project_change() {
        let event = ChangeEvent::new("main", ["projects/lambda-project-foo/handler.js"]);
        assert!(should_fire(&event, &foo_filter()));
    }

    #[test]
    fn test_sibling_with_shared_prefix_does_not_cross_trigger() {
        let foo = foo_filter();
        let foobar = TriggerFilter::for_project("lambda-project-foobar", "main");

        let foo_event = ChangeEvent::new("main", ["projects/lambda-project-foo/handler.js"]);
        assert!(should_fire(&foo_event, &foo));
        assert!(!should_fire(&foo_event, &foobar));

        let foobar_event = ChangeEvent::new("main", ["projects/lambda-project-foobar/handler.js"]);
        assert!(!should_fire(&foobar_event, &foo));
        assert!(should_fire(&foobar_event, &foobar));
    }

    #[test]
    fn test_branch_gating() {
        let event = ChangeEvent::new("dev", ["projects/lambda-project-foo/handler.js"]);
        assert_eq!(
            evaluate(&event, &foo_filter()),
            TriggerDecision::Mismatch {
                reason: MismatchReason::BranchExcluded
            }
        );
    }

    #[test]
    fn test_no_changed_paths_never_fires() {
        let event = ChangeEvent::new("main", Vec::<String>::new());
        assert_eq!(
            evaluate(&event, &foo_filter()),
            TriggerDecision::Mismatch {
                reason: MismatchReason::NoChangedPaths
            }
        );
    }

    #[test]
    fn test_matching_is_exact() {
        let filter = foo_filter();
        for path in [
            "./projects/lambda-project-foo/handler.js",
            "Projects/lambda-project-foo/handler.js",
            "projects/lambda-project-foo",
            "projects/LAMBDA-PROJECT-FOO/handler.js",
        ] {
            let event = ChangeEvent::new("main", [path]);
            assert!(!should_fire(&event, &filter), "{path} should not fire");
        }
    }

    #[test]
    fn test_nested_paths_fire_parent() {
        let event = ChangeEvent::new("main", ["projects/lambda-project-foo/sub/deep/file.txt"]);
        assert!(should_fire(&event, &foo_filter()));
    }

    #[test]
    fn test_any_matching_path_fires() {
        let event = ChangeEvent::new(
            "main",
            [
                "README.md",
                "projects/lambda-project-foobar/index.js",
                "projects/lambda-project-foo/buildspec.yml",
            ],
        );
        assert_eq!(
            evaluate(&event, &foo_filter()),
            TriggerDecision::Fire {
                matched_paths: vec!["projects/lambda-project-foo/buildspec.yml".to_string()]
            }
        );
    }

    #[test]
    fn test_evaluation_is_pure() {
        let filter = foo_filter();
        let rejected = ChangeEvent::new("main", ["infrastructure/lib/stack.ts"]);
        let accepted = ChangeEvent::new("main", ["projects/lambda-project-foo/a.js"]);

        assert_eq!(should_fire(&rejected, &filter), should_fire(&rejected, &filter));
        assert!(!should_fire(&rejected, &filter));
        assert_eq!(evaluate(&accepted, &filter), evaluate(&accepted, &filter));
    }

    #[test]
    fn test_exact_pattern() {
        assert!(path_matches("projects/shared.json", "projects/shared.json"));
        assert!(!path_matches("projects/shared.json", "projects/shared.json.bak"));
    }
}
