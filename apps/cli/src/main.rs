use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use favorites_tree::{AddOutcome, FavoriteId, FavoriteKind, FavoritesConfig, FavoritesStore};
use tracing_subscriber::EnvFilter;

/// Marker name used when `--workspace` points at a directory.
const DIRECTORY_MARKER: &str = ".favorites-workspace";

#[derive(Parser)]
#[command(
    name = "favorites-cli",
    about = "Inspect and edit a workspace's favorites.json",
    author,
    version
)]
struct Cli {
    /// 工作區標記檔或資料夾；預設為目前目錄。 / Workspace marker file or directory (defaults to current directory).
    #[arg(long, global = true, value_name = "PATH")]
    workspace: Option<PathBuf>,
    /// 設定檔路徑。 / Favorites config JSON.
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,
    /// 顯示除錯記錄。 / Log debug details to stderr.
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 列出收藏樹。 / Print the favorites tree.
    List,
    /// 加入檔案收藏。 / Favorite a file.
    Add(AddArgs),
    /// 建立虛擬資料夾。 / Create a favorites folder.
    Mkdir(MkdirArgs),
    /// 重新命名項目。 / Rename an entry.
    Rename(RenameArgs),
    /// 移動項目。 / Move an entry to another folder or the root.
    Move(MoveArgs),
    /// 移除項目。 / Remove an entry and its children.
    Remove(RemoveArgs),
    /// 檢查檔案是否已收藏。 / Report whether a file is favorited.
    Check(CheckArgs),
}

#[derive(Args)]
struct AddArgs {
    /// 要收藏的檔案。 / File to favorite.
    #[arg(value_name = "FILE")]
    file: PathBuf,
    /// 目標資料夾（以 / 分隔的顯示名稱）。 / Target folder as a `/`-separated display path.
    #[arg(long, value_name = "FOLDER")]
    folder: Option<String>,
}

#[derive(Args)]
struct MkdirArgs {
    /// 資料夾名稱。 / Folder name.
    name: String,
    /// 上層資料夾。 / Parent folder display path.
    #[arg(long, value_name = "FOLDER")]
    parent: Option<String>,
}

#[derive(Args)]
struct RenameArgs {
    /// 項目的顯示路徑。 / Display path of the entry.
    entry: String,
    /// 新名稱。 / New name.
    name: String,
}

#[derive(Args)]
struct MoveArgs {
    /// 項目的顯示路徑。 / Display path of the entry.
    entry: String,
    /// 目標資料夾；省略時移到根層。 / Destination folder; the root when omitted.
    #[arg(long, value_name = "FOLDER")]
    to: Option<String>,
}

#[derive(Args)]
struct RemoveArgs {
    /// 項目的顯示路徑。 / Display path of the entry.
    entry: String,
}

#[derive(Args)]
struct CheckArgs {
    /// 要檢查的檔案。 / File to look up.
    #[arg(value_name = "FILE")]
    file: PathBuf,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let Cli {
        workspace,
        config,
        verbose,
        command,
    } = Cli::parse();
    init_tracing(verbose);

    let config = match config {
        Some(path) => {
            let path = resolve_input_path(&path)?;
            FavoritesConfig::load(&path)
                .with_context(|| format!("failed to load config {}", path.display()))?
        }
        None => FavoritesConfig::default(),
    };
    let marker = workspace_marker(workspace)?;
    let mut store = FavoritesStore::new(config);
    store.load(&marker);

    match command {
        Commands::List => execute_list(&store),
        Commands::Add(args) => execute_add(&mut store, args),
        Commands::Mkdir(args) => execute_mkdir(&mut store, args),
        Commands::Rename(args) => execute_rename(&mut store, args),
        Commands::Move(args) => execute_move(&mut store, args),
        Commands::Remove(args) => execute_remove(&mut store, args),
        Commands::Check(args) => execute_check(&store, args),
    }
}

fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn execute_list(store: &FavoritesStore) -> Result<()> {
    if !store.has_favorites() {
        println!("No favorites yet.");
        return Ok(());
    }
    print_level(store, store.root_items(), 0);
    Ok(())
}

fn print_level(store: &FavoritesStore, ids: &[FavoriteId], depth: usize) {
    let indent = "  ".repeat(depth);
    for id in ids {
        let Some(entry) = store.entry(*id) else {
            continue;
        };
        match entry.kind() {
            FavoriteKind::Folder { children } => {
                println!("{indent}{}/", entry.name());
                print_level(store, children, depth + 1);
            }
            FavoriteKind::File { path } => {
                println!("{indent}{} ({})", entry.name(), path.display());
            }
        }
    }
}

fn execute_add(store: &mut FavoritesStore, args: AddArgs) -> Result<()> {
    let file = resolve_input_path(&args.file)?;
    let outcome = match args.folder.as_deref() {
        Some(folder) => {
            let folder = resolve_folder(store, folder)?;
            store.add_file_to_folder(&file, folder)
        }
        None => store.add_file(&file),
    };
    match outcome {
        AddOutcome::Added(_) => println!("Added {}", file.display()),
        AddOutcome::AlreadyFavorited => println!("{} is already a favorite", file.display()),
        AddOutcome::Unavailable => bail!("could not add {}", file.display()),
    }
    Ok(())
}

fn execute_mkdir(store: &mut FavoritesStore, args: MkdirArgs) -> Result<()> {
    let created = match args.parent.as_deref() {
        Some(parent) => {
            let parent = resolve_folder(store, parent)?;
            store.create_folder_in(&args.name, parent)
        }
        None => store.create_folder(&args.name),
    };
    if created.is_none() {
        bail!("could not create folder '{}'", args.name);
    }
    println!("Created folder {}", args.name.trim());
    Ok(())
}

fn execute_rename(store: &mut FavoritesStore, args: RenameArgs) -> Result<()> {
    let id = resolve_entry(store, &args.entry)?;
    if !store.rename(id, &args.name) {
        bail!("could not rename '{}' to '{}'", args.entry, args.name);
    }
    println!("Renamed {} to {}", args.entry, args.name);
    Ok(())
}

fn execute_move(store: &mut FavoritesStore, args: MoveArgs) -> Result<()> {
    let id = resolve_entry(store, &args.entry)?;
    let target = match args.to.as_deref() {
        Some(folder) => Some(resolve_folder(store, folder)?),
        None => None,
    };
    if !store.move_item(id, target) {
        bail!(
            "cannot move '{}' into '{}'",
            args.entry,
            args.to.as_deref().unwrap_or("/")
        );
    }
    println!("Moved {}", args.entry);
    Ok(())
}

fn execute_remove(store: &mut FavoritesStore, args: RemoveArgs) -> Result<()> {
    let id = resolve_entry(store, &args.entry)?;
    if !store.remove(id) {
        bail!("could not remove '{}'", args.entry);
    }
    println!("Removed {}", args.entry);
    Ok(())
}

fn execute_check(store: &FavoritesStore, args: CheckArgs) -> Result<()> {
    let file = resolve_input_path(&args.file)?;
    if store.is_favorited(&file) {
        println!("favorited: {}", file.display());
    } else {
        println!("not favorited: {}", file.display());
    }
    Ok(())
}

fn resolve_entry(store: &FavoritesStore, display_path: &str) -> Result<FavoriteId> {
    let names: Vec<&str> = display_path
        .split('/')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .collect();
    match store.find_by_names(names.as_slice()) {
        Some(id) => Ok(id),
        None => bail!("no favorite named '{display_path}'"),
    }
}

fn resolve_folder(store: &FavoritesStore, display_path: &str) -> Result<FavoriteId> {
    let id = resolve_entry(store, display_path)?;
    match store.entry(id) {
        Some(entry) if entry.is_folder() => Ok(id),
        _ => bail!("'{display_path}' is not a folder"),
    }
}

fn workspace_marker(workspace: Option<PathBuf>) -> Result<PathBuf> {
    let path = match workspace {
        Some(path) => resolve_input_path(&path)?,
        None => std::env::current_dir().context("determine current directory")?,
    };
    if path.is_dir() {
        Ok(path.join(DIRECTORY_MARKER))
    } else {
        Ok(path)
    }
}

fn resolve_input_path(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()
            .context("determine current directory")?
            .join(path))
    }
}
