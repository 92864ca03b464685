//! Find-references and find-definition

use serde::Serialize;
use tracing::debug;

use super::{resolve_target, Position};
use crate::error::{RefactorError, Result};
use crate::project::Project;
use crate::semantic::SemanticModel;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Reference {
    pub file: String,
    pub line: usize,
    pub column: usize,
    /// UTF-16 offset of the occurrence
    pub offset: usize,
    pub text: String,
    pub is_definition: bool,
    pub is_write: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferencesResult {
    pub success: bool,
    pub symbol: String,
    pub references: Vec<Reference>,
    pub count: usize,
}

pub fn find_references(project: &mut Project, file: &str, offset: usize) -> Result<ReferencesResult> {
    let file_id = project.open_file(file)?;
    let model = SemanticModel::build(project);
    let target = resolve_target(project, &model, file_id, offset)?;
    let symbol = target.symbol.ok_or_else(|| {
        RefactorError::NotRenameable(format!(
            "'{}' is not bound to a symbol declared in this project",
            target.name
        ))
    })?;

    let related = model.related_symbols(symbol);
    let mut references: Vec<Reference> = model
        .occurrences_of(&related)
        .into_iter()
        .map(|occurrence| {
            let source = project.file(occurrence.file);
            let position = Position::of(project, occurrence.file, occurrence.start);
            Reference {
                file: project.display_path(occurrence.file),
                line: position.line,
                column: position.column,
                offset: source.utf16_offset(occurrence.start),
                text: source.text()[occurrence.start..occurrence.end].to_string(),
                is_definition: occurrence.is_definition,
                is_write: occurrence.is_write,
            }
        })
        .collect();
    references.sort_by(|a, b| (&a.file, a.offset).cmp(&(&b.file, b.offset)));
    debug!("{} references to '{}'", references.len(), target.name);

    Ok(ReferencesResult {
        success: true,
        symbol: model.symbol(symbol).name.clone(),
        count: references.len(),
        references,
    })
}

/// `found: false` results carry only `message`; found results carry the location
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DefinitionResult {
    pub success: bool,
    pub found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl DefinitionResult {
    fn not_found(message: String) -> Self {
        Self {
            success: true,
            found: false,
            message: Some(message),
            ..Self::default()
        }
    }
}

pub fn find_definition(project: &mut Project, file: &str, offset: usize) -> Result<DefinitionResult> {
    let file_id = project.open_file(file)?;
    let model = SemanticModel::build(project);
    let target = match resolve_target(project, &model, file_id, offset) {
        Ok(target) => target,
        Err(RefactorError::NotRenameable(message)) => {
            return Ok(DefinitionResult::not_found(message))
        }
        Err(e) => return Err(e),
    };

    let Some(symbol) = target.symbol else {
        return Ok(DefinitionResult::not_found(format!(
            "No definition found for '{}'",
            target.name
        )));
    };
    let original = model.original(symbol);
    let definition = model.symbol(original);
    let Some(declaration) = definition.first_declaration() else {
        return Ok(DefinitionResult::not_found(format!(
            "'{}' has no declaration in the project",
            target.name
        )));
    };

    let position = Position::of(project, declaration.file, declaration.name_start);
    Ok(DefinitionResult {
        success: true,
        found: true,
        name: Some(definition.name.clone()),
        kind: Some(definition.kind.as_str().to_string()),
        file: Some(project.display_path(declaration.file)),
        line: Some(position.line),
        column: Some(position.column),
        offset: Some(project.file(declaration.file).utf16_offset(declaration.name_start)),
        message: None,
    })
}
