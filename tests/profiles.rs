//! End-to-end profile scenarios against a temporary data root.

use std::fs;
use std::os::unix::fs::symlink;
use std::path::{Path, PathBuf};
use std::process::Command;

use rootswitch::profile::read_symlink;
use rootswitch::settings::codec;
use rootswitch::settings::{ProfileSettings, SettingValue, DISPLAY_WIDTH, VERBOSE_LOGGING};
use rootswitch::{Error, Layout, ProfileStore};

fn store() -> (tempfile::TempDir, ProfileStore) {
    let dir = tempfile::tempdir().unwrap();
    let store = ProfileStore::with_tool(Layout::new(dir.path()), "tar");
    store.initialize_profiles().unwrap();
    (dir, store)
}

fn tar_available() -> bool {
    Command::new("tar").arg("--version").output().is_ok()
}

/// Relative path -> file contents or symlink target, for a whole tree.
fn snapshot(root: &Path) -> Vec<(PathBuf, String)> {
    fn walk(root: &Path, dir: &Path, out: &mut Vec<(PathBuf, String)>) {
        let mut entries: Vec<_> = fs::read_dir(dir).unwrap().map(|e| e.unwrap()).collect();
        entries.sort_by_key(|e| e.file_name());
        for entry in entries {
            let path = entry.path();
            let rel = path.strip_prefix(root).unwrap().to_path_buf();
            let ty = entry.file_type().unwrap();
            if ty.is_symlink() {
                out.push((rel, format!("-> {}", fs::read_link(&path).unwrap().display())));
            } else if ty.is_dir() {
                out.push((rel, "dir".into()));
                walk(root, &path, out);
            } else {
                out.push((rel, fs::read_to_string(&path).unwrap()));
            }
        }
    }
    let mut out = Vec::new();
    walk(root, root, &mut out);
    out
}

fn install_rom(store: &ProfileStore, name: &str) {
    let rootfs = store.layout().profile_rootfs_dir(name);
    fs::create_dir_all(rootfs.join("system/etc")).unwrap();
    fs::write(rootfs.join("init"), "init").unwrap();
    fs::write(rootfs.join("rom.ini"), "code=1\nversion=1.0\n").unwrap();
    fs::write(rootfs.join("system/etc/hosts"), "127.0.0.1 localhost\n").unwrap();
    symlink("/system/bin/linker64", rootfs.join("linker")).unwrap();
    symlink("etc/hosts", rootfs.join("system/hosts")).unwrap();
}

#[test]
fn work_profile_lifecycle() {
    let (_dir, store) = store();

    store.create_profile("work").unwrap();
    assert_eq!(store.list_profiles().unwrap(), vec!["default", "work"]);

    store.switch_profile("work").unwrap();
    assert_eq!(
        read_symlink(&store.layout().active_symlink_path()).unwrap(),
        store.layout().profile_rootfs_dir("work")
    );

    assert!(matches!(
        store.delete_profile("default"),
        Err(Error::ProtectedProfile { .. })
    ));

    store.switch_profile("default").unwrap();
    store.delete_profile("work").unwrap();
    assert_eq!(store.list_profiles().unwrap(), vec!["default"]);
}

#[test]
fn invalid_name_creates_nothing() {
    let (_dir, store) = store();
    let before = snapshot(store.layout().data_root());

    assert!(matches!(
        store.create_profile("a;b"),
        Err(Error::InvalidName { .. })
    ));
    assert_eq!(snapshot(store.layout().data_root()), before);
}

#[test]
fn rename_round_trip_restores_everything() {
    let (_dir, store) = store();
    store.create_profile("a").unwrap();
    install_rom(&store, "a");
    store.settings().set_int("a", DISPLAY_WIDTH, 720).unwrap();
    store.settings().set_string("a", "label", "mine").unwrap();

    let tree = snapshot(&store.layout().profile_dir("a"));
    let settings = store.settings().load("a").unwrap();

    store.rename_profile("a", "b").unwrap();
    assert!(!store.layout().profile_dir("a").exists());
    store.rename_profile("b", "a").unwrap();

    assert_eq!(snapshot(&store.layout().profile_dir("a")), tree);
    assert_eq!(store.settings().load("a").unwrap(), settings);
    assert!(store.settings().load("b").unwrap().is_empty());
}

#[test]
fn copy_is_exact_and_independent() {
    if !tar_available() {
        eprintln!("Skipping: tar not available");
        return;
    }
    let (_dir, store) = store();
    store.create_profile("a").unwrap();
    install_rom(&store, "a");
    store.settings().set_bool("a", VERBOSE_LOGGING, false).unwrap();

    store.copy_profile("a", "b").unwrap();

    let a_rootfs = store.layout().profile_rootfs_dir("a");
    let b_rootfs = store.layout().profile_rootfs_dir("b");
    assert_eq!(snapshot(&b_rootfs), snapshot(&a_rootfs));
    assert_eq!(
        store.settings().load("b").unwrap(),
        store.settings().load("a").unwrap()
    );

    fs::write(a_rootfs.join("init"), "modified").unwrap();
    fs::remove_file(a_rootfs.join("linker")).unwrap();
    assert_eq!(fs::read_to_string(b_rootfs.join("init")).unwrap(), "init");
    assert_eq!(
        fs::read_link(b_rootfs.join("linker")).unwrap(),
        PathBuf::from("/system/bin/linker64")
    );
}

#[test]
fn export_then_import_reproduces_profile() {
    if !tar_available() {
        eprintln!("Skipping: tar not available");
        return;
    }
    let (dir, store) = store();
    store.create_profile("a").unwrap();
    install_rom(&store, "a");
    store.settings().set_bool("a", VERBOSE_LOGGING, true).unwrap();
    store.settings().set_int("a", DISPLAY_WIDTH, 1080).unwrap();

    let archive = dir.path().join("export.tar");
    store.export_profile("a", &archive).unwrap();
    store
        .import_profile("b", fs::File::open(&archive).unwrap())
        .unwrap();

    assert_eq!(
        snapshot(&store.layout().profile_rootfs_dir("b")),
        snapshot(&store.layout().profile_rootfs_dir("a"))
    );
    assert_eq!(
        store.settings().load("b").unwrap(),
        store.settings().load("a").unwrap()
    );

    // Importing into a fresh data root works too.
    let other = tempfile::tempdir().unwrap();
    let other_store = ProfileStore::with_tool(Layout::new(other.path()), "tar");
    other_store
        .import_profile("a", fs::File::open(&archive).unwrap())
        .unwrap();
    assert!(other_store.list_profiles().unwrap().contains(&"a".to_string()));
}

#[test]
fn settings_round_trip_through_text_format() {
    let mut settings = ProfileSettings::new();
    settings.insert(VERBOSE_LOGGING.into(), SettingValue::Bool(true));
    settings.insert(DISPLAY_WIDTH.into(), SettingValue::Int(1080));

    let decoded = codec::decode(&codec::encode(&settings));
    assert_eq!(decoded[VERBOSE_LOGGING], SettingValue::Bool(true));
    assert_eq!(decoded[DISPLAY_WIDTH], SettingValue::Int(1080));
}

#[test]
fn switched_profile_is_linked() {
    let (_dir, store) = store();
    for name in ["one", "two", "three"] {
        store.create_profile(name).unwrap();
        store.switch_profile(name).unwrap();
        assert_eq!(
            read_symlink(&store.layout().active_symlink_path()).unwrap(),
            store.layout().profile_rootfs_dir(name)
        );
        assert!(matches!(
            store.delete_profile(name),
            Err(Error::ProtectedProfile { .. })
        ));
    }
}

#[test]
fn store_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    {
        let store = ProfileStore::with_tool(Layout::new(dir.path()), "tar");
        store.initialize_profiles().unwrap();
        store.create_profile("work").unwrap();
        store.switch_profile("work").unwrap();
    }
    let store = ProfileStore::with_tool(Layout::new(dir.path()), "tar");
    assert_eq!(store.get_active_profile().unwrap(), "work");
}
