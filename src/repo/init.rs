use std::fs;
use std::io::Result;
use std::path::Path;

use crate::object::HashAlgorithm;

/// Create a fresh git directory layout.
///
/// The caller has already decided where the git dir lives (`.git` inside a
/// work tree, or the repository path itself when bare) and that nothing is
/// there yet.
pub(crate) fn create_layout(git_dir: &Path, bare: bool, algorithm: HashAlgorithm) -> Result<()> {
    fs::create_dir_all(git_dir)?;

    create_config(git_dir, bare, algorithm)?;
    create_description(git_dir)?;
    create_head(git_dir)?;
    create_hooks_dir(git_dir)?;
    create_info_dir(git_dir)?;
    create_objects_dir(git_dir)?;
    create_refs_dir(git_dir)?;

    Ok(())
}

fn create_config(git_dir: &Path, bare: bool, algorithm: HashAlgorithm) -> Result<()> {
    let config_path = git_dir.join("config");

    let mut config_txt = format!(
        "[core]\n\trepositoryformatversion = {}\n\tfilemode = true\n\tbare = {}\n",
        if algorithm == HashAlgorithm::Sha256 { 1 } else { 0 },
        bare
    );
    if !bare {
        config_txt.push_str("\tlogallrefupdates = true\n");
    }
    if algorithm == HashAlgorithm::Sha256 {
        config_txt.push_str("[extensions]\n\tobjectformat = sha256\n");
    }

    fs::write(config_path, config_txt)
}

fn create_description(git_dir: &Path) -> Result<()> {
    let desc_path = git_dir.join("description");
    let desc_txt = "Unnamed repository; edit this file 'description' to name the repository.\n";

    fs::write(desc_path, desc_txt)
}

fn create_head(git_dir: &Path) -> Result<()> {
    let head_path = git_dir.join("HEAD");
    let head_txt = "ref: refs/heads/main\n";

    fs::write(head_path, head_txt)
}

fn create_hooks_dir(git_dir: &Path) -> Result<()> {
    let hooks_dir = git_dir.join("hooks");
    fs::create_dir_all(hooks_dir)

    // NOTE: Intentionally not including the sample files.
}

fn create_info_dir(git_dir: &Path) -> Result<()> {
    let info_dir = git_dir.join("info");
    fs::create_dir_all(&info_dir)?;

    let exclude_path = info_dir.join("exclude");
    let exclude_txt = "# Lines that start with '#' are comments.\n";

    fs::write(exclude_path, exclude_txt)
}

fn create_objects_dir(git_dir: &Path) -> Result<()> {
    let info_dir = git_dir.join("objects/info");
    fs::create_dir_all(info_dir)?;

    let pack_dir = git_dir.join("objects/pack");
    fs::create_dir_all(pack_dir)
}

fn create_refs_dir(git_dir: &Path) -> Result<()> {
    let heads_dir = git_dir.join("refs/heads");
    fs::create_dir_all(heads_dir)?;

    let tags_dir = git_dir.join("refs/tags");
    fs::create_dir_all(tags_dir)
}
