//! Installation phases and the log-line triggers that prove each was reached
//!
//! Every predicate takes the already lower-cased message so it can be
//! golden-tested against recorded installer output on its own.

use regex::Regex;

/// Ordered, human-readable labels of the installation phases
pub const DEPLOYMENT_STEPS: [&str; 5] = [
    "Validating configuration",
    "Providing infrastructure (on provider side)",
    "Verifying provided infrastructure",
    "Installing Qovery stack",
    "Verifying kube deprecation API calls",
];

/// Index of the last phase
pub const FINAL_STEP: usize = DEPLOYMENT_STEPS.len() - 1;

/// Step markers meaning a fresh installation attempt has begun
pub const START_STEPS: [&str; 5] = [
    "LoadConfiguration",
    "Create",
    "RetrieveClusterConfig",
    "RetrieveClusterResources",
    "ValidateSystemRequirements",
];

/// Step marker emitted when cluster creation fails
pub const ERROR_STEP: &str = "CreateError";

/// Default phrase announcing a finished installation
pub const DEFAULT_COMPLETION_PHRASE: &str = "kubernetes cluster successfully created";

const INFRASTRUCTURE_VERIFIED_MARKERS: [&str; 5] = [
    "saved the plan to",
    "kubernetes nodes have been successfully created",
    "checking if karpenter nodegroup should be deployed",
    "ensuring all groups nodes are in ready state from the scaleway api",
    "ensuring no failed nodegroups are present in the cluster",
];

const INSTALLING_STACK_MARKER: &str = "preparing helm files on disk";

/// Quote characters the installer may wrap a cluster name in
const NAME_QUOTES: [char; 4] = ['`', '\'', '"', '\u{2019}'];

const DEPRECATED_API_MARKER: &str = "check if cluster has calls to deprecated kubernetes api";

/// What a log line is matched against besides its own text
#[derive(Debug, Clone, Default)]
pub struct InstallTarget {
    pub cluster_name: Option<String>,
    pub provider_code: Option<String>,
    banner: Option<Regex>,
}

impl InstallTarget {
    pub fn new(cluster_name: Option<String>, provider_code: Option<&str>) -> Self {
        let provider_code = provider_code
            .filter(|c| !c.is_empty())
            .map(str::to_string);
        let banner = provider_code.as_deref().and_then(|code| {
            Regex::new(&format!(
                r"deployment\s+{}\s+cluster(?:\s+(.+))?",
                regex::escape(&code.to_lowercase())
            ))
            .ok()
        });
        Self {
            cluster_name,
            provider_code,
            banner,
        }
    }
}

pub fn is_start_step(step: &str) -> bool {
    START_STEPS.contains(&step)
}

/// Step 1: the provider-side deployment banner, e.g. `Deployment EKS cluster demo1`.
///
/// Without a provider code there is nothing to match. When both the line and
/// the target carry a cluster name they must agree.
pub fn announces_deployment(message: &str, target: &InstallTarget) -> bool {
    let Some(caps) = target.banner.as_ref().and_then(|re| re.captures(message)) else {
        return false;
    };

    match (caps.get(1), target.cluster_name.as_deref()) {
        (Some(rest), Some(expected)) => names_cluster(rest.as_str(), expected),
        _ => true,
    }
}

/// The banner tail starts with `expected`, ignoring quotes and trailing
/// punctuation. Names may contain spaces, so the whole tail is compared.
fn names_cluster(rest: &str, expected: &str) -> bool {
    let expected = expected.trim().to_lowercase();
    if expected.is_empty() {
        return true;
    }

    let rest = rest.trim_start_matches(|c: char| c.is_whitespace() || NAME_QUOTES.contains(&c));
    match rest.strip_prefix(expected.as_str()) {
        Some(tail) => !tail
            .chars()
            .next()
            .is_some_and(|c| c.is_alphanumeric() || c == '-' || c == '_'),
        None => false,
    }
}

/// Step 2: infrastructure plan applied and nodes checked
pub fn infrastructure_verified(message: &str) -> bool {
    INFRASTRUCTURE_VERIFIED_MARKERS
        .iter()
        .any(|marker| message.contains(marker))
}

/// Step 3: the platform stack is being installed
pub fn installing_stack(message: &str) -> bool {
    message.contains(INSTALLING_STACK_MARKER)
}

/// Step 4: the final deprecated-API verification
pub fn checking_deprecated_apis(message: &str) -> bool {
    message.contains(DEPRECATED_API_MARKER)
}

/// Highest phase index the message proves, or 0 when nothing matches
pub fn matched_step(message: &str, target: &InstallTarget) -> usize {
    if checking_deprecated_apis(message) {
        FINAL_STEP
    } else if installing_stack(message) {
        3
    } else if infrastructure_verified(message) {
        2
    } else if announces_deployment(message, target) {
        1
    } else {
        0
    }
}
