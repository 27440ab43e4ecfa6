use serde::Deserialize;
use serde_json;

/// Struct representing the JIRA `/rest/api/2/myself` API response.
#[derive(Deserialize, Debug, PartialEq)]
pub struct UserResponse {
    /// Login name on JIRA Server / Data Center. Absent on JIRA Cloud.
    pub name: Option<String>,
    /// Account id on JIRA Cloud.
    #[serde(rename = "accountId")]
    pub account_id: Option<String>,
    #[serde(rename = "displayName")]
    pub display_name: String,
}

/// Extracts a printable identity from a JIRA `/myself` API JSON response string.
///
/// # Returns
///
/// * `Ok("login (Display Name)")` if parsing succeeds.
/// * `Err(error_message)` if parsing fails.
pub fn extract_user_from_myself_response(json: &str) -> Result<String, String> {
    serde_json::from_str::<UserResponse>(json)
        .map(|user| match user.name.or(user.account_id) {
            Some(login) => format!("{login} ({})", user.display_name),
            None => user.display_name,
        })
        .map_err(|e| format!("Failed to parse user response: {e}"))
}
