use std::io::{self, BufRead, Write};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use immoscope_core::filters::{self, SelectionFilter};
use immoscope_core::search::{self, SearchQuery};
use immoscope_core::tabular::to_rows;
use immoscope_core::{PropertyTable, ViewCache, ViewKind};
use tracing::info;

use crate::render::{self, OutputFormat};
use crate::Session;

const HELP: &str = "\
commands:
  view <name> [limit]          render a view (views: list names)
  views                        list view names
  summary                      count and average prices of the selection
  search <postal> [radius_km]  postal-code / radius search
  departments [a,b,...]        restrict departments (no argument clears)
  types [a,b,...]              restrict property types (no argument clears)
  reload                       drop the cached table
  help | quit";

struct ShellState {
    selection: SelectionFilter,
    base: Option<Arc<PropertyTable>>,
    views: Option<ViewCache>,
    selection_changed: bool,
}

impl ShellState {
    /// Views over the current selection, re-pointed when the cached table or selection changed.
    fn views(&mut self, session: &Session) -> Result<&mut ViewCache> {
        let table = session.table()?;
        let stale = self.selection_changed
            || self
                .base
                .as_ref()
                .map_or(true, |base| !Arc::ptr_eq(base, &table));

        if stale || self.views.is_none() {
            let selected = Arc::new(self.selection.apply(&table));
            match self.views.as_mut() {
                Some(views) => views.replace_table(selected),
                None => {
                    self.views = Some(ViewCache::new(selected, session.config.views.clone()));
                }
            }
        }
        self.base = Some(table);
        self.selection_changed = false;

        self.views
            .as_mut()
            .ok_or_else(|| anyhow!("view cache was not initialised"))
    }

    fn set_selection(&mut self, selection: SelectionFilter) {
        self.selection = selection;
        self.selection_changed = true;
    }
}

pub fn run(session: &Session, selection: SelectionFilter, format: OutputFormat) -> Result<()> {
    let mut state = ShellState {
        selection,
        base: None,
        views: None,
        selection_changed: false,
    };

    println!("{HELP}");
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        print!("> ");
        io::stdout().flush()?;

        let Some(line) = lines.next() else {
            break;
        };
        let line = line.context("failed to read command")?;
        let mut tokens = line.split_whitespace();
        let Some(command) = tokens.next() else {
            continue;
        };
        let args: Vec<&str> = tokens.collect();

        if matches!(command, "quit" | "exit") {
            break;
        }
        if let Err(err) = dispatch(session, &mut state, command, &args, format) {
            eprintln!("error: {err:#}");
        }
    }

    Ok(())
}

fn dispatch(
    session: &Session,
    state: &mut ShellState,
    command: &str,
    args: &[&str],
    format: OutputFormat,
) -> Result<()> {
    match command {
        "help" => println!("{HELP}"),
        "views" => {
            let names: Vec<String> = ViewKind::ALL.iter().map(ToString::to_string).collect();
            render::print_list("Views", &names, format)?;
        }
        "view" => {
            let name = args.first().ok_or_else(|| anyhow!("usage: view <name> [limit]"))?;
            let kind: ViewKind = name.parse().map_err(|err: String| anyhow!(err))?;
            let limit = args.get(1).map(|value| value.parse::<usize>()).transpose()?;
            let rows = state.views(session)?.get(kind);
            render::print_rows(kind.as_str(), &rows, format, limit)?;
        }
        "summary" => {
            let views = state.views(session)?;
            let summary = filters::market_summary(views.table());
            render::print_rows("Summary", &to_rows(&[summary])?, format, None)?;
        }
        "search" => {
            let postal = args
                .first()
                .ok_or_else(|| anyhow!("usage: search <postal> [radius_km]"))?;
            let radius_km = args
                .get(1)
                .map(|value| value.parse::<f64>())
                .transpose()?
                .unwrap_or(0.0);
            let query = SearchQuery::postal_code(*postal).with_radius_km(radius_km);
            let views = state.views(session)?;
            let result = search::search(views.table(), &query);
            println!("{} properties found", result.matches.len());
            render::print_rows("Properties", &to_rows(&result.matches)?, format, Some(20))?;
        }
        "departments" => {
            let mut selection = state.selection.clone();
            selection.departments = parse_list(args);
            state.set_selection(selection);
        }
        "types" => {
            let mut selection = state.selection.clone();
            selection.property_types = parse_list(args);
            state.set_selection(selection);
        }
        "reload" => {
            session.cache.invalidate();
            info!("table cache invalidated");
        }
        other => return Err(anyhow!("unknown command '{other}', try 'help'")),
    }
    Ok(())
}

fn parse_list(args: &[&str]) -> Vec<String> {
    args.join(" ")
        .split(',')
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .collect()
}
