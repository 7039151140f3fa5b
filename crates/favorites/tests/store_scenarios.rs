use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use favorites_tree::{AddOutcome, FavoriteId, FavoritesConfig, FavoritesDocument, FavoritesStore};
use tempfile::{tempdir, TempDir};

fn loaded_store() -> (TempDir, FavoritesStore) {
    let dir = tempdir().expect("tempdir");
    let mut store = FavoritesStore::default();
    store.load(dir.path().join("app.sln"));
    (dir, store)
}

fn names(store: &FavoritesStore, ids: &[FavoriteId]) -> Vec<String> {
    ids.iter()
        .map(|id| store.entry(*id).expect("entry").name().to_string())
        .collect()
}

fn index_keys(store: &FavoritesStore) -> Vec<String> {
    let mut keys: Vec<String> = store.path_index().keys().map(str::to_string).collect();
    keys.sort();
    keys
}

#[test]
fn folder_then_files_walkthrough() {
    let (dir, mut store) = loaded_store();

    let utils = store.create_folder("Utils").expect("folder");
    assert_eq!(names(&store, store.root_items()), ["Utils"]);

    let readme = store
        .add_file_to_folder(dir.path().join("readme.txt"), utils)
        .id()
        .expect("readme added");
    assert_eq!(names(&store, store.folder_items(utils)), ["readme.txt"]);
    assert_eq!(index_keys(&store), ["readme.txt"]);

    store.add_file(dir.path().join("main.cs"));
    assert_eq!(names(&store, store.root_items()), ["Utils", "main.cs"]);

    assert!(store.move_item(readme, None));
    assert_eq!(
        names(&store, store.root_items()),
        ["Utils", "main.cs", "readme.txt"]
    );
    assert!(store.folder_items(utils).is_empty());
    assert_eq!(index_keys(&store), ["main.cs", "readme.txt"]);
}

#[test]
fn duplicate_add_is_reported_and_changes_nothing() {
    let (dir, mut store) = loaded_store();
    let folder = store.create_folder("Docs").expect("folder");
    let path = dir.path().join("notes").join("Todo.md");

    assert!(matches!(store.add_file(&path), AddOutcome::Added(_)));
    let before = store.document();

    assert_eq!(
        store.add_file_to_folder(&path, folder),
        AddOutcome::AlreadyFavorited
    );
    assert_eq!(
        store.add_file(dir.path().join("NOTES").join("todo.MD")),
        AddOutcome::AlreadyFavorited
    );
    assert_eq!(store.document(), before);
    assert_eq!(index_keys(&store), ["notes/todo.md"]);
    assert!(store.is_favorited(dir.path().join("notes/TODO.md")));
}

#[test]
fn folders_cannot_move_into_themselves_or_descendants() {
    let (_dir, mut store) = loaded_store();
    let outer = store.create_folder("outer").expect("outer");
    let middle = store.create_folder_in("middle", outer).expect("middle");
    let inner = store.create_folder_in("inner", middle).expect("inner");
    let before = store.document();

    assert!(!store.move_item(outer, Some(outer)));
    assert!(!store.move_item(outer, Some(middle)));
    assert!(!store.move_item(outer, Some(inner)));
    assert!(!store.move_item(middle, Some(inner)));
    assert_eq!(store.document(), before);

    assert!(store.move_item(inner, None));
    assert_eq!(names(&store, store.root_items()), ["inner", "outer"]);
}

#[test]
fn move_into_a_file_is_ignored() {
    let (dir, mut store) = loaded_store();
    let folder = store.create_folder("box").expect("folder");
    let file = store.add_file(dir.path().join("a.txt")).id().expect("file");
    assert!(!store.move_item(folder, Some(file)));
    assert_eq!(store.root_items(), [folder, file]);
}

#[test]
fn removing_a_file_drops_one_node_and_one_path() {
    let (dir, mut store) = loaded_store();
    let folder = store.create_folder("src").expect("folder");
    let lib = store
        .add_file_to_folder(dir.path().join("lib.rs"), folder)
        .id()
        .expect("lib");
    store.add_file_to_folder(dir.path().join("main.rs"), folder);

    assert!(store.remove(lib));
    assert_eq!(names(&store, store.folder_items(folder)), ["main.rs"]);
    assert_eq!(index_keys(&store), ["main.rs"]);
    assert!(store.entry(lib).is_none());

    assert!(!store.remove(lib));
}

#[test]
fn removing_a_folder_drops_descendant_paths_only() {
    let (dir, mut store) = loaded_store();
    let docs = store.create_folder("docs").expect("docs");
    let nested = store.create_folder_in("nested", docs).expect("nested");
    store.add_file_to_folder(dir.path().join("a.md"), docs);
    store.add_file_to_folder(dir.path().join("b.md"), nested);
    let keep_folder = store.create_folder("keep").expect("keep");
    store.add_file_to_folder(dir.path().join("c.md"), keep_folder);
    store.add_file(dir.path().join("d.md"));

    assert!(store.remove(docs));
    assert_eq!(names(&store, store.root_items()), ["keep", "d.md"]);
    assert_eq!(names(&store, store.folder_items(keep_folder)), ["c.md"]);
    assert_eq!(index_keys(&store), ["c.md", "d.md"]);
    assert!(store.entry(nested).is_none());
}

#[test]
fn changes_persist_across_loads() {
    let (dir, mut store) = loaded_store();
    let folder = store.create_folder("Deep").expect("folder");
    let sub = store.create_folder_in("Sub \"quoted\"", folder).expect("sub");
    store.add_file_to_folder(dir.path().join("x").join("y.rs"), sub);
    store.add_file("/outside/base/z.txt");
    let saved = store.document();

    let mut reloaded = FavoritesStore::default();
    reloaded.load(dir.path().join("app.sln"));
    assert_eq!(reloaded.document(), saved);
    assert!(reloaded.is_favorited(dir.path().join("x/y.rs")));
    assert!(reloaded.is_favorited("/outside/base/z.txt"));

    let raw = fs::read_to_string(dir.path().join("favorites.json")).expect("read");
    assert!(raw.contains("\"version\": 2"));
    assert!(raw.contains("\"path\": \"x/y.rs\""));
    assert!(raw.contains("\"path\": \"/outside/base/z.txt\""));
}

#[test]
fn hand_edited_file_is_sorted_on_load() {
    let dir = tempdir().expect("tempdir");
    fs::write(
        dir.path().join("favorites.json"),
        r#"{
            "version": 2,
            "items": [
                { "name": "zeta.txt", "path": "zeta.txt" },
                { "name": "Beta", "children": [
                    { "name": "b.txt", "path": "b.txt" },
                    { "name": "A.txt", "path": "a.txt" }
                ] },
                { "name": "alpha", "children": [] },
                { "name": "Alpha.txt", "path": "alpha.txt" }
            ]
        }"#,
    )
    .expect("write favorites");

    let mut store = FavoritesStore::default();
    store.load(dir.path().join("app.sln"));

    assert_eq!(
        names(&store, store.root_items()),
        ["alpha", "Beta", "Alpha.txt", "zeta.txt"]
    );
    let beta = store.find_by_names(&["beta"]).expect("beta");
    assert_eq!(names(&store, store.folder_items(beta)), ["A.txt", "b.txt"]);
    assert_eq!(index_keys(&store), ["a.txt", "alpha.txt", "b.txt", "zeta.txt"]);
}

#[test]
fn corrupt_file_loads_as_empty_and_still_notifies() {
    let dir = tempdir().expect("tempdir");
    fs::write(dir.path().join("favorites.json"), "{ \"items\": [ oops").expect("write");

    let mut store = FavoritesStore::default();
    let notified = Rc::new(RefCell::new(0));
    let counter = Rc::clone(&notified);
    store.subscribe_content_changed(move |folder| {
        assert!(folder.is_none());
        *counter.borrow_mut() += 1;
    });

    store.load(dir.path().join("app.sln"));
    assert!(store.is_loaded());
    assert!(!store.has_favorites());
    assert_eq!(*notified.borrow(), 1);

    store.add_file(dir.path().join("fresh.txt"));
    let raw = fs::read_to_string(dir.path().join("favorites.json")).expect("read");
    let document: FavoritesDocument = serde_json::from_str(&raw).expect("valid json");
    assert_eq!(document.items.len(), 1);
}

#[test]
fn custom_file_name_from_config() {
    let dir = tempdir().expect("tempdir");
    let config = FavoritesConfig {
        file_name: "team-favorites.json".to_string(),
        ..FavoritesConfig::default()
    };
    let mut store = FavoritesStore::new(config);
    store.load(dir.path().join("app.sln"));
    store.create_folder("Shared");

    let expected: PathBuf = dir.path().join("team-favorites.json");
    assert_eq!(store.storage_path(), Some(expected.as_path()));
    assert!(expected.exists());
    assert!(!dir.path().join("favorites.json").exists());
}

#[test]
fn shared_store_is_visible_to_every_holder() {
    let dir = tempdir().expect("tempdir");
    let shared = FavoritesStore::default().shared();
    let view = shared.clone();
    assert!(view.ptr_eq(&shared));

    shared.update(|store| store.load(dir.path().join("app.sln")));
    let id = shared
        .update(|store| store.add_file(dir.path().join("a.txt")))
        .id()
        .expect("added");
    assert!(shared.update(|store| store.rename(id, "Renamed")));

    let view = view.read();
    assert_eq!(view.entry(id).map(|entry| entry.name()), Some("Renamed"));
    assert_eq!(view.entry(id).and_then(|entry| entry.path()), Some(Path::new("a.txt")));
}

#[test]
fn listener_can_read_the_shared_store_while_it_reloads() {
    let dir = tempdir().expect("tempdir");
    fs::write(
        dir.path().join("favorites.json"),
        r#"{"version":2,"items":[{"name":"a.txt","path":"a.txt"},{"name":"Docs","children":[]}]}"#,
    )
    .expect("seed favorites");

    let shared = FavoritesStore::default().shared();
    let weak = shared.downgrade();
    let snapshots = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&snapshots);
    shared.update(|store| {
        store.subscribe_content_changed(move |_| {
            let store = weak.upgrade().expect("store alive");
            let store = store.read();
            sink.borrow_mut().push(names(&store, store.root_items()));
        })
    });

    shared.update(|store| store.load(dir.path().join("app.sln")));
    shared.update(|store| store.clear());

    assert_eq!(
        *snapshots.borrow(),
        [vec!["Docs".to_string(), "a.txt".to_string()], Vec::new()]
    );
}

#[test]
fn file_names_that_look_encoded_survive_a_reload() {
    let (dir, mut store) = loaded_store();
    store.add_file(dir.path().join("keep.rs"));
    store.add_file(dir.path().join("b64:report.txt"));

    let raw = fs::read_to_string(dir.path().join("favorites.json")).expect("saved");
    assert!(raw.contains(r#""path": "b64:report.txt""#));

    let mut reloaded = FavoritesStore::default();
    reloaded.load(dir.path().join("app.sln"));
    assert_eq!(names(&reloaded, reloaded.root_items()), ["b64:report.txt", "keep.rs"]);
    assert!(reloaded.is_favorited(dir.path().join("b64:report.txt")));
    assert!(reloaded.is_favorited(dir.path().join("keep.rs")));
}

#[test]
fn unreadable_path_drops_only_its_entry() {
    let dir = tempdir().expect("tempdir");
    fs::write(
        dir.path().join("favorites.json"),
        r#"{"version":2,"items":[
            {"name":"keep.rs","path":"keep.rs"},
            {"name":"broken","path":{"bytes":"***"}},
            {"name":"odd","path":42},
            {"name":"Docs","children":[{"name":"inner.md","path":"docs/inner.md"}]}
        ]}"#,
    )
    .expect("seed favorites");

    let mut store = FavoritesStore::default();
    store.load(dir.path().join("app.sln"));

    assert_eq!(names(&store, store.root_items()), ["Docs", "keep.rs"]);
    assert_eq!(index_keys(&store), ["docs/inner.md", "keep.rs"]);
}
