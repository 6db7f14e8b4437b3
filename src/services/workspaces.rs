// Workspace service: create, list and look up deal workspaces.

use crate::error::DealError;
use crate::state::AppState;
use crate::types::{NewWorkspace, Workspace};
use crate::util::{dedupe_tags, slugify};

/// Create a workspace whose ID is the slug of the company name.
pub fn create_workspace(state: &AppState, body: NewWorkspace) -> Result<Workspace, DealError> {
    let name = body.name.trim();
    if name.is_empty() {
        return Err(DealError::validation("Company name is required"));
    }
    let id = slugify(name);
    if id.is_empty() {
        return Err(DealError::validation("Invalid company name"));
    }

    let workspace = Workspace {
        id,
        name: name.to_string(),
        description: body.description.trim().to_string(),
        deal_context: body.deal_context.trim().to_string(),
        deal_summary: body.deal_summary.trim().to_string(),
        renewal_info: body.renewal_info.trim().to_string(),
        teams: dedupe_tags(body.teams),
        color: body
            .color
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| "emerald".to_string()),
    };

    let db = state.db.lock();
    if db.workspace_exists(&workspace.id)? {
        return Err(DealError::DuplicateWorkspace(workspace.id));
    }
    db.insert_workspace(&workspace)?;
    log::info!("Created workspace {} ({})", workspace.id, workspace.name);
    Ok(workspace)
}

pub fn list_workspaces(state: &AppState) -> Result<Vec<Workspace>, DealError> {
    Ok(state.db.lock().list_workspaces()?)
}

pub fn get_workspace(state: &AppState, id: &str) -> Result<Workspace, DealError> {
    state
        .db
        .lock()
        .get_workspace(id)?
        .ok_or_else(|| DealError::not_found("workspace", id))
}
