use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context;
use colored::Colorize;
use lexo_meta::MetadataCatalog;
use lexo_sdk::{Fixture, LoadedFixture, ObjectCache};
use lexo_store::PropertyStore;
use lexo_types::{ClassId, FieldTag, ObjectId, PropValue};
use lexo_virtual::{resolve_path, DependencyPath};
use serde_json::json;
use tracing::debug;

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let format = cli.format;
    match cli.command {
        Command::Inspect(args) => cmd_inspect(args, format),
        Command::Materialize(args) => cmd_materialize(args, format),
        Command::Virtual(args) => cmd_virtual(args, format),
        Command::Deps(args) => cmd_deps(args, format),
    }
}

fn open(path: &Path) -> anyhow::Result<(LoadedFixture, ObjectCache)> {
    let fixture = Fixture::load(path).with_context(|| format!("reading fixture {}", path.display()))?;
    let loaded = fixture.build().context("building fixture")?;
    let cache = ObjectCache::from_fixture(&loaded).context("installing virtual properties")?;
    debug!(
        path = %path.display(),
        objects = loaded.keys().count(),
        virtuals = cache.registry().len(),
        "fixture opened"
    );
    Ok((loaded, cache))
}

fn class_name(catalog: &dyn MetadataCatalog, class: ClassId) -> String {
    catalog.class_name(class).unwrap_or_else(|| class.to_string())
}

fn field_name(catalog: &dyn MetadataCatalog, tag: FieldTag) -> String {
    match catalog.field(tag) {
        Some(f) => format!("{}.{}", class_name(catalog, f.owner_class), f.name),
        None => tag.to_string(),
    }
}

fn label(loaded: &LoadedFixture, id: ObjectId) -> String {
    match loaded.key_of(id) {
        Some(key) => format!("#{key}"),
        None => id.to_string(),
    }
}

fn describe(loaded: &LoadedFixture, value: Option<&PropValue>) -> String {
    match value {
        None => "(none)".dimmed().to_string(),
        Some(PropValue::Vector(ids)) => {
            let items: Vec<String> = ids.iter().map(|id| label(loaded, *id)).collect();
            format!("[{}]", items.join(", "))
        }
        Some(PropValue::Object(id)) => label(loaded, *id),
        Some(PropValue::Boolean(b)) => b.to_string(),
        Some(PropValue::Integer(n)) => n.to_string(),
        Some(PropValue::String(s)) => format!("{s:?}"),
    }
}

fn render_path(catalog: &dyn MetadataCatalog, path: &DependencyPath) -> String {
    let steps: Vec<String> = path.tags().iter().map(|t| field_name(catalog, *t)).collect();
    steps.join(" -> ")
}

fn print_json(value: &serde_json::Value) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn cmd_inspect(args: InspectArgs, format: OutputFormat) -> anyhow::Result<()> {
    let (loaded, cache) = open(&args.fixture)?;
    let catalog = loaded.catalog.as_ref();
    let store = loaded.store.as_ref();

    let mut classes = loaded.catalog.classes();
    classes.sort_by_key(|c| c.id);
    let fields: Vec<_> = catalog.all_fields().into_iter().filter(|f| !f.is_virtual).collect();
    let mut counts = BTreeMap::new();
    for class in &classes {
        counts.insert(class.name.clone(), store.instance_count(class.id)?);
    }
    let handlers = cache.registry().handlers();

    if format == OutputFormat::Json {
        let virtuals: Vec<_> = handlers
            .iter()
            .map(|h| {
                let d = h.descriptor();
                json!({
                    "tag": d.tag(),
                    "class": d.class_name(),
                    "field": d.field_name(),
                    "kind": d.kind(),
                    "handler": h.type_name(),
                    "compute_every_time": d.compute_every_time(),
                    "writable": d.writable(),
                    "dependencies": d.dependencies().iter().map(|p| p.tags().to_vec()).collect::<Vec<_>>(),
                })
            })
            .collect();
        return print_json(&json!({
            "classes": classes,
            "fields": fields,
            "objects": counts,
            "virtual_properties": virtuals,
        }));
    }

    println!("{}", "Classes".bold());
    for class in &classes {
        let mut line = format!("  {} {}", class.id.to_string().dimmed(), class.name.bold());
        if let Some(base) = class.base {
            line.push_str(&format!(" : {}", class_name(catalog, base)));
        }
        if class.is_abstract {
            line.push_str(&format!(" {}", "(abstract)".cyan()));
        }
        if class.requires_owner {
            line.push_str(&format!(" {}", "(owned)".cyan()));
        }
        println!("{line}");
    }

    println!("\n{}", "Fields".bold());
    for field in &fields {
        let target = field
            .signature
            .map(|s| format!(" -> {}", class_name(catalog, s)))
            .unwrap_or_default();
        println!(
            "  {} {}.{} {}{}",
            field.tag.to_string().dimmed(),
            class_name(catalog, field.owner_class),
            field.name.bold(),
            field.kind.to_string().yellow(),
            target
        );
    }

    println!("\n{}", "Objects".bold());
    for (name, count) in &counts {
        println!("  {name}: {count}");
    }

    println!("\n{}", "Virtual properties".bold());
    if handlers.is_empty() {
        println!("  none");
    }
    for handler in &handlers {
        let d = handler.descriptor();
        let mut flags = Vec::new();
        if d.compute_every_time() {
            flags.push("always computed");
        }
        if d.writable() {
            flags.push("writable");
        }
        let flags = if flags.is_empty() {
            String::new()
        } else {
            format!(" ({})", flags.join(", ")).cyan().to_string()
        };
        println!(
            "  {} {}.{} {}{}",
            d.tag().to_string().dimmed(),
            d.class_name(),
            d.field_name().bold(),
            d.kind().to_string().yellow(),
            flags
        );
        for path in d.dependencies() {
            println!("      depends on {}", render_path(catalog, path));
        }
    }
    Ok(())
}

fn cmd_materialize(args: MaterializeArgs, format: OutputFormat) -> anyhow::Result<()> {
    let (loaded, cache) = open(&args.fixture)?;
    let catalog = loaded.catalog.as_ref();
    let ids = args
        .keys
        .iter()
        .map(|k| loaded.id(*k))
        .collect::<Result<Vec<_>, _>>()?;
    let objects = cache.materialize(&ids)?;

    if format == OutputFormat::Json {
        let rows: Vec<_> = args
            .keys
            .iter()
            .zip(&ids)
            .map(|(key, id)| match objects.get(id) {
                Some(obj) => json!({
                    "key": key,
                    "id": obj.id(),
                    "class": class_name(catalog, obj.class()),
                    "owner": obj.owner().map(|o| json!({
                        "key": loaded.key_of(o.owner),
                        "field": field_name(catalog, o.field),
                    })),
                }),
                None => json!({ "key": key, "missing": true }),
            })
            .collect();
        return print_json(&json!({
            "objects": rows,
            "identity_cache": cache.identity().len(),
        }));
    }

    for (key, id) in args.keys.iter().zip(&ids) {
        match objects.get(id) {
            Some(obj) => {
                let owner = obj
                    .owner()
                    .map(|o| format!(" in {} {}", label(&loaded, o.owner), field_name(catalog, o.field)))
                    .unwrap_or_default();
                println!(
                    "{} #{} {} {}{}",
                    "✓".green(),
                    key,
                    obj.id().to_string().dimmed(),
                    class_name(catalog, obj.class()).bold(),
                    owner
                );
            }
            None => println!("{} #{} not found", "✗".red(), key),
        }
    }
    println!(
        "Identity cache now holds {} objects.",
        cache.identity().len().to_string().bold()
    );
    Ok(())
}

fn cmd_virtual(args: VirtualArgs, format: OutputFormat) -> anyhow::Result<()> {
    let (loaded, cache) = open(&args.fixture)?;
    let id = loaded.id(args.key)?;
    if args.bulk {
        cache.begin_bulk_load();
    }
    let value = cache.read_named(id, &args.class, &args.field);
    if args.bulk {
        cache.end_bulk_load()?;
    }
    let value = value?;

    if format == OutputFormat::Json {
        let keys = match &value {
            Some(PropValue::Vector(ids)) => json!(ids.iter().map(|id| loaded.key_of(*id)).collect::<Vec<_>>()),
            Some(PropValue::Object(id)) => json!(loaded.key_of(*id)),
            _ => serde_json::Value::Null,
        };
        return print_json(&json!({
            "key": args.key,
            "class": args.class,
            "field": args.field,
            "value": value,
            "keys": keys,
        }));
    }

    println!(
        "{}.{} of #{} = {}",
        args.class,
        args.field.bold(),
        args.key,
        describe(&loaded, value.as_ref())
    );
    Ok(())
}

fn cmd_deps(args: DepsArgs, format: OutputFormat) -> anyhow::Result<()> {
    let fixture = Fixture::load(&args.fixture)
        .with_context(|| format!("reading fixture {}", args.fixture.display()))?;
    let loaded = fixture.build().context("building fixture")?;
    let catalog = loaded.catalog.as_ref();
    let class = catalog
        .class_id(&args.class)
        .with_context(|| format!("unknown class {}", args.class))?;

    let paths: Vec<&str> = args.spec.split(',').map(str::trim).filter(|p| !p.is_empty()).collect();
    let results: Vec<_> = paths.iter().map(|p| (*p, resolve_path(catalog, class, p))).collect();

    if format == OutputFormat::Json {
        let rows: Vec<_> = results
            .iter()
            .map(|(path, result)| match result {
                Ok(resolved) => json!({ "path": path, "tags": resolved.tags() }),
                Err(e) => json!({ "path": path, "error": e.to_string() }),
            })
            .collect();
        return print_json(&json!(rows));
    }

    for (path, result) in &results {
        match result {
            Ok(resolved) => println!("{} {}  {}", "✓".green(), path.bold(), render_path(catalog, resolved)),
            Err(e) => println!("{} {}  {}", "✗".red(), path.bold(), e.to_string().red()),
        }
    }
    Ok(())
}
