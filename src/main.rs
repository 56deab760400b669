use anyhow::{bail, Context, Result};
use clap::Parser;
use gcodeview::{
    default_config_path, init_logging, summarize, MoveDump, MoveType, ToolpathViewer,
    TriangleSoup, ViewType, ViewerSettings, BUILD_DATE, VERSION,
};
use std::path::PathBuf;
use tracing::{debug, info, warn};

fn parse_view_type(name: &str) -> std::result::Result<ViewType, String> {
    ViewType::from_name(name).ok_or_else(|| {
        let known: Vec<&str> = ViewType::ALL.iter().map(|v| v.name()).collect();
        format!("unknown view type '{}', expected one of {}", name, known.join(", "))
    })
}

fn parse_move_type(name: &str) -> std::result::Result<MoveType, String> {
    MoveType::BUFFER_TYPES
        .into_iter()
        .find(|t| t.name() == name)
        .ok_or_else(|| format!("unknown move type '{}'", name))
}

fn parse_layer_range(text: &str) -> std::result::Result<[usize; 2], String> {
    let (lo, hi) = text
        .split_once(':')
        .ok_or_else(|| format!("expected FIRST:LAST, got '{}'", text))?;
    let lo = lo.trim().parse::<usize>().map_err(|e| e.to_string())?;
    let hi = hi.trim().parse::<usize>().map_err(|e| e.to_string())?;
    if lo > hi {
        return Err(format!("layer range {}:{} is reversed", lo, hi));
    }
    Ok([lo, hi])
}

/// Load a decoded move dump, build its toolpaths and report what was built.
#[derive(Parser, Debug)]
#[command(name = "gcodeview", version)]
struct Args {
    /// JSON move dump (`{"moves": [...], "metadata": {...}}`)
    input: PathBuf,

    /// Settings file (.json or .toml). Defaults to the user config file when present.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Color mode used for batching
    #[arg(long, value_parser = parse_view_type)]
    view: Option<ViewType>,

    /// Extra move types to show, e.g. `--show travel --show retract`
    #[arg(long, value_parser = parse_move_type)]
    show: Vec<MoveType>,

    /// Inclusive layer range as FIRST:LAST
    #[arg(long, value_parser = parse_layer_range)]
    layers: Option<[usize; 2]>,

    /// Scrub the playback window so it ends at this move id
    #[arg(long)]
    upto: Option<usize>,

    /// Override the vertex capacity of a buffer chunk
    #[arg(long)]
    chunk_capacity: Option<usize>,

    /// Write the visible extrusions as a Wavefront OBJ file
    #[arg(long)]
    export_obj: Option<PathBuf>,

    /// Print the summary as JSON
    #[arg(long, default_value_t = false)]
    json: bool,
}

fn load_settings(args: &Args) -> Result<ViewerSettings> {
    let path = match &args.config {
        Some(path) => Some(path.clone()),
        None => Some(default_config_path()).filter(|p| p.exists()),
    };

    let mut settings = match path {
        Some(path) => {
            debug!("Loading settings from {}", path.display());
            ViewerSettings::load_from_file(&path)
                .with_context(|| format!("failed to load settings from {}", path.display()))?
        }
        None => ViewerSettings::default(),
    };

    if let Some(capacity) = args.chunk_capacity {
        settings.buffers.max_vertices_per_chunk = capacity;
        settings.validate()?;
    }
    if let Some(view) = args.view {
        settings.display.view_type = view;
    }
    for &move_type in &args.show {
        if !settings.display.visible_move_types.contains(&move_type) {
            settings.display.visible_move_types.push(move_type);
        }
    }
    Ok(settings)
}

fn main() -> Result<()> {
    init_logging()?;
    let args = Args::parse();
    debug!("gcodeview {} (built {})", VERSION, BUILD_DATE);

    let settings = load_settings(&args)?;
    let text = std::fs::read_to_string(&args.input)
        .with_context(|| format!("failed to read {}", args.input.display()))?;
    let dump = MoveDump::from_json(&text)
        .with_context(|| format!("failed to decode {}", args.input.display()))?;

    let mut viewer = ToolpathViewer::new(settings);
    viewer
        .load(&dump.moves, &dump.metadata)
        .with_context(|| format!("failed to build toolpaths for {}", args.input.display()))?;
    info!(
        "Built {} moves in {:.1} ms",
        viewer.moves_count(),
        viewer.statistics().load_time_ms
    );

    if let Some(range) = args.layers {
        if range[1] >= viewer.layers().size() {
            warn!(
                "Layer range {}:{} exceeds the {} detected layers",
                range[0],
                range[1],
                viewer.layers().size()
            );
        }
        let retention = viewer.set_layers_z_range(range);
        viewer.refresh_render_paths_keeping(retention);
    }

    if let Some(upto) = args.upto {
        let first = viewer.sequential_view().current.first;
        if viewer.update_sequential_view_current(first, upto).is_none() {
            debug!("Playback window unchanged");
        }
    }

    if let Some(path) = &args.export_obj {
        if !viewer.can_export_toolpaths() {
            bail!("no visible extrusion geometry to export");
        }
        let mut soup = TriangleSoup::new();
        let triangles = viewer.export_toolpaths(&mut soup);
        soup.save_obj(path)
            .with_context(|| format!("failed to write {}", path.display()))?;
        info!("Exported {} triangles to {}", triangles, path.display());
    }

    let summary = summarize(&viewer);
    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("moves:     {}", summary.moves);
        println!("layers:    {}", summary.layers);
        println!("view:      {}", summary.view_type);
        println!("window:    {}..={}", summary.window.first, summary.window.last);
        println!("roles:     {}", summary.roles.join(", "));
        for (name, buffer) in &summary.buffers {
            println!(
                "{:<13} {} paths, {} chunks, {} vertices, {} indices, {} batches",
                name,
                buffer.paths,
                buffer.chunks,
                buffer.vertices,
                buffer.indices,
                buffer.render_paths
            );
        }
        if let Some(bbox) = summary.bounding_box {
            println!("bounds:    {} .. {}", bbox.min, bbox.max);
        }
    }

    Ok(())
}
