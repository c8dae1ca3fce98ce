//! Console deep links used as notification targets

pub fn infra_logs_path(organization_id: &str, cluster_id: &str) -> String {
    format!("/organization/{}/infra-logs/{}", organization_id, cluster_id)
}

pub fn project_overview_path(organization_id: &str, project_id: &str) -> String {
    format!("/organization/{}/project/{}/overview", organization_id, project_id)
}

pub fn cluster_overview_path(organization_id: &str, cluster_id: &str) -> String {
    format!("/organization/{}/cluster/{}/overview", organization_id, cluster_id)
}

/// Join a console base URL and a path without doubling the slash
pub fn absolute(console_url: &str, path: &str) -> String {
    format!("{}{}", console_url.trim_end_matches('/'), path)
}
