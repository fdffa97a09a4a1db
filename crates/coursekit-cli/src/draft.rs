//! `draft` subcommands: every edit goes through a [`DraftSession`] so it is
//! autosaved the same way the wizard saves.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Subcommand;
use coursekit_core::{validate, AppConfig, CourseDraft, Geometry, Location, Position};
use coursekit_draft::DraftSession;
use uuid::Uuid;

#[derive(Debug, Subcommand)]
pub enum DraftCommands {
    /// Start an empty draft
    New {
        /// Replace an existing saved draft
        #[arg(long)]
        force: bool,
    },
    /// Print the saved draft
    Show {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Set text fields of the draft; an empty value clears the hero image
    Set {
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        duration: Option<String>,
        #[arg(long)]
        budget: Option<String>,
        #[arg(long)]
        season: Option<String>,
        /// Local path or URL of the cover image
        #[arg(long)]
        hero: Option<String>,
        #[arg(long)]
        content: Option<String>,
    },
    /// Add or remove tags
    Tag {
        #[command(subcommand)]
        command: TagCommands,
    },
    /// Edit the ordered list of stops
    Location {
        #[command(subcommand)]
        command: LocationCommands,
    },
    /// Replace the draft with one read from a YAML file
    Import { path: PathBuf },
    /// Run publish validation without publishing
    Check,
}

#[derive(Debug, Subcommand)]
pub enum TagCommands {
    Add { tag: String },
    Remove { tag: String },
}

#[derive(Debug, Subcommand)]
pub enum LocationCommands {
    /// Add a stop, at the end unless `--at` is given
    Add {
        #[arg(long)]
        name: String,
        /// Stable id of the stop (generated when omitted)
        #[arg(long)]
        id: Option<String>,
        #[arg(long)]
        address: Option<String>,
        #[arg(long, requires = "lng", allow_negative_numbers = true)]
        lat: Option<f64>,
        #[arg(long, requires = "lat", allow_negative_numbers = true)]
        lng: Option<f64>,
        /// Local path or URL of the stop's photo
        #[arg(long)]
        image: Option<String>,
        /// 1-based position in the visit order
        #[arg(long)]
        at: Option<usize>,
    },
    /// Remove the stop with this id
    Remove { id: String },
    /// Move the stop at one 1-based position to another
    Move { from: usize, to: usize },
    /// Set or clear the coordinates of a stop
    Position {
        id: String,
        #[arg(long, requires = "lng", allow_negative_numbers = true, conflicts_with = "clear")]
        lat: Option<f64>,
        #[arg(long, requires = "lat", allow_negative_numbers = true)]
        lng: Option<f64>,
        #[arg(long)]
        clear: bool,
    },
}

/// Run one `draft` subcommand and return what to print.
///
/// # Errors
///
/// Returns an error for invalid edits, unreadable imports, or (for `check`)
/// a draft that would fail publishing.
pub fn run_draft_command(
    session: &mut DraftSession,
    command: DraftCommands,
    config: &AppConfig,
) -> anyhow::Result<String> {
    match command {
        DraftCommands::New { force } => {
            if session.was_restored() && !force {
                anyhow::bail!(
                    "a draft already exists (last saved {}); pass --force to replace it",
                    session.draft().last_saved_at
                );
            }
            session.replace(CourseDraft::new());
            Ok("started a new draft".to_string())
        }
        DraftCommands::Show { json } => {
            if json {
                Ok(serde_json::to_string_pretty(session.draft())?)
            } else {
                Ok(render_draft(session.draft()))
            }
        }
        DraftCommands::Set {
            title,
            description,
            duration,
            budget,
            season,
            hero,
            content,
        } => {
            let changed = [&title, &description, &duration, &budget, &season, &hero, &content]
                .iter()
                .any(|v| v.is_some());
            if !changed {
                anyhow::bail!("nothing to set; pass at least one field");
            }
            session.edit(|d| {
                set_if(&mut d.title, title);
                set_if(&mut d.description, description);
                set_if(&mut d.duration, duration);
                set_if(&mut d.budget, budget);
                set_if(&mut d.season, season);
                set_if(&mut d.content, content);
                if let Some(hero) = hero {
                    d.hero_image_ref = Some(hero).filter(|h| !h.trim().is_empty());
                }
            });
            Ok("draft updated".to_string())
        }
        DraftCommands::Tag { command } => Ok(run_tag_command(session, command)),
        DraftCommands::Location { command } => run_location_command(session, command),
        DraftCommands::Import { path } => {
            let draft = read_draft_file(&path)?;
            let stops = draft.locations.len();
            session.replace(draft);
            let mut out = format!("imported {} ({stops} stops)", path.display());
            if let Err(failure) = validate(session.draft(), &config.validation_limits()) {
                let _ = write!(out, "\nnot publishable yet: {}", failure.message);
            }
            Ok(out)
        }
        DraftCommands::Check => {
            validate(session.draft(), &config.validation_limits())?;
            Ok("draft is ready to publish".to_string())
        }
    }
}

fn run_tag_command(session: &mut DraftSession, command: TagCommands) -> String {
    match command {
        TagCommands::Add { tag } => {
            if session.edit(|d| d.add_tag(tag.clone())) {
                format!("added tag '{tag}'")
            } else {
                format!("tag '{tag}' already present")
            }
        }
        TagCommands::Remove { tag } => {
            if session.edit(|d| d.remove_tag(&tag)) {
                format!("removed tag '{tag}'")
            } else {
                format!("no tag '{tag}'")
            }
        }
    }
}

fn run_location_command(
    session: &mut DraftSession,
    command: LocationCommands,
) -> anyhow::Result<String> {
    match command {
        LocationCommands::Add {
            name,
            id,
            address,
            lat,
            lng,
            image,
            at,
        } => {
            let id = id.unwrap_or_else(|| Uuid::new_v4().simple().to_string());
            let mut location = Location::new(id.clone(), name);
            if let Some(address) = address {
                location = location.with_address(address);
            }
            if let (Some(lat), Some(lng)) = (lat, lng) {
                location = location.with_position(Position::new(lat, lng));
            }
            if let Some(image) = image {
                location = location.with_image(image);
            }
            match at {
                Some(at) => {
                    let index = to_index(at)?;
                    session.edit(|d| d.insert_location(index, location))?;
                }
                None => session.edit(|d| d.push_location(location))?,
            }
            Ok(format!("added stop {id}"))
        }
        LocationCommands::Remove { id } => {
            let removed = session.edit(|d| d.remove_location(&id))?;
            Ok(format!("removed stop {} ({})", removed.id, removed.name))
        }
        LocationCommands::Move { from, to } => {
            let (from, to) = (to_index(from)?, to_index(to)?);
            session.edit(|d| d.move_location(from, to))?;
            Ok("stops reordered".to_string())
        }
        LocationCommands::Position {
            id,
            lat,
            lng,
            clear,
        } => {
            let position = match (lat, lng, clear) {
                (Some(lat), Some(lng), false) => Some(Position::new(lat, lng)),
                (None, None, true) => None,
                _ => anyhow::bail!("pass --lat and --lng, or --clear"),
            };
            session.edit(|d| d.set_position(&id, position))?;
            Ok(format!("updated position of stop {id}"))
        }
    }
}

fn set_if(field: &mut String, value: Option<String>) {
    if let Some(value) = value {
        *field = value;
    }
}

fn to_index(position: usize) -> anyhow::Result<usize> {
    position
        .checked_sub(1)
        .context("stop positions start at 1")
}

/// Parse a YAML course draft. Missing fields take their defaults.
///
/// # Errors
///
/// Returns an error if the YAML is malformed or does not describe a draft.
pub fn parse_draft_yaml(raw: &str) -> anyhow::Result<CourseDraft> {
    serde_yaml::from_str(raw).context("invalid course draft YAML")
}

fn read_draft_file(path: &Path) -> anyhow::Result<CourseDraft> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse_draft_yaml(&raw)
}

pub fn render_summary(session: &DraftSession) -> String {
    if !session.was_restored() {
        return "no saved draft; start one with `coursekit draft new`".to_string();
    }
    let draft = session.draft();
    let title = if draft.title.trim().is_empty() {
        "(untitled)"
    } else {
        draft.title.as_str()
    };
    format!(
        "{title}: {} stops, {} tags, last saved {}",
        draft.locations.len(),
        draft.tags.len(),
        draft.last_saved_at
    )
}

pub fn render_draft(draft: &CourseDraft) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "title:       {}", draft.title);
    let _ = writeln!(out, "description: {}", draft.description);
    let _ = writeln!(out, "tags:        {}", draft.tags.join(", "));
    let _ = writeln!(out, "duration:    {}", draft.duration);
    let _ = writeln!(out, "budget:      {}", draft.budget);
    let _ = writeln!(out, "season:      {}", draft.season);
    let _ = writeln!(
        out,
        "hero image:  {}",
        draft.hero_image_ref.as_deref().unwrap_or("-")
    );
    let _ = writeln!(out, "last saved:  {}", draft.last_saved_at);
    let _ = writeln!(out, "stops:");
    if draft.locations.is_empty() {
        let _ = writeln!(out, "  (none)");
    }
    for (i, loc) in draft.locations.iter().enumerate() {
        let position = loc
            .position
            .map_or_else(|| "no position".to_string(), |p| format!("{}, {}", p.lat, p.lng));
        let _ = writeln!(out, "  {}. {} [{}] ({position})", i + 1, loc.name, loc.id);
    }
    out.trim_end().to_string()
}

/// Format a map preview as text or JSON.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn render_geometry(geometry: &Geometry, json: bool) -> anyhow::Result<String> {
    if json {
        let value = serde_json::json!({
            "centroid": geometry.centroid,
            "path": geometry.path,
            "bounds": geometry.bounds(),
            "has_route_line": geometry.has_route_line(),
        });
        return Ok(serde_json::to_string_pretty(&value)?);
    }
    let Some(centroid) = geometry.centroid else {
        return Ok("no positioned stops".to_string());
    };
    let mut out = format!("centroid: {}, {}", centroid.lat, centroid.lng);
    let _ = write!(out, "\npath: {} points", geometry.path.len());
    if !geometry.has_route_line() {
        out.push_str(" (no route line)");
    }
    for p in &geometry.path {
        let _ = write!(out, "\n  {}, {}", p.lat, p.lng);
    }
    Ok(out)
}
