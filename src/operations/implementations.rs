//! Find-implementations: implementing classes, extending interfaces, subclasses of
//! abstract classes, and overriding members

use serde::Serialize;

use super::{resolve_target, Position};
use crate::error::Result;
use crate::project::Project;
use crate::semantic::{SemanticModel, SymbolId, SymbolKind};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Implementation {
    pub file: String,
    pub line: usize,
    pub column: usize,
    pub kind: String,
    pub name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImplementationsResult {
    pub success: bool,
    pub symbol: String,
    pub implementations: Vec<Implementation>,
    pub count: usize,
}

pub fn find_implementations(
    project: &mut Project,
    file: &str,
    offset: usize,
) -> Result<ImplementationsResult> {
    let file_id = project.open_file(file)?;
    let model = SemanticModel::build(project);
    let target = resolve_target(project, &model, file_id, offset)?;

    let Some(symbol) = target.symbol else {
        return Ok(ImplementationsResult {
            success: true,
            symbol: target.name,
            implementations: Vec::new(),
            count: 0,
        });
    };
    let original = model.original(symbol);
    let found = implementations_of(&model, original);

    let mut implementations: Vec<Implementation> = found
        .into_iter()
        .filter_map(|(id, kind, name)| {
            let declaration = model.symbol(id).first_declaration()?;
            let position = Position::of(project, declaration.file, declaration.name_start);
            Some(Implementation {
                file: project.display_path(declaration.file),
                line: position.line,
                column: position.column,
                kind: kind.to_string(),
                name,
            })
        })
        .collect();
    implementations.sort_by(|a, b| (&a.file, a.line, a.column).cmp(&(&b.file, b.line, b.column)));
    implementations.dedup_by(|a, b| a.file == b.file && a.line == b.line && a.column == b.column);

    Ok(ImplementationsResult {
        success: true,
        symbol: model.symbol(original).name.clone(),
        count: implementations.len(),
        implementations,
    })
}

/// (symbol, result kind, display name) for every implementation of `symbol`
fn implementations_of(model: &SemanticModel, symbol: SymbolId) -> Vec<(SymbolId, &'static str, String)> {
    let s = model.symbol(symbol);
    match s.kind {
        SymbolKind::Interface => model
            .derived(symbol)
            .iter()
            .filter_map(|id| type_result(model, *id))
            .collect(),
        SymbolKind::Class if s.is_abstract => model
            .derived(symbol)
            .iter()
            .filter(|id| model.symbol(**id).kind == SymbolKind::Class)
            .filter_map(|id| type_result(model, *id))
            .collect(),
        SymbolKind::Method | SymbolKind::Property | SymbolKind::Getter | SymbolKind::Setter => {
            let Some(owner) = s.parent else {
                return Vec::new();
            };
            model
                .all_derived(owner)
                .into_iter()
                .filter(|class| model.symbol(*class).kind == SymbolKind::Class)
                .filter_map(|class| {
                    let member = *model.symbol(class).members.get(&s.name)?;
                    let name = format!("{}.{}", model.symbol(class).name, s.name);
                    Some((member, "method", name))
                })
                .collect()
        }
        _ => Vec::new(),
    }
}

fn type_result(model: &SemanticModel, id: SymbolId) -> Option<(SymbolId, &'static str, String)> {
    let symbol = model.symbol(id);
    let kind = match symbol.kind {
        SymbolKind::Class => "class",
        SymbolKind::Interface => "interface",
        _ => return None,
    };
    Some((id, kind, symbol.name.clone()))
}
