use std::path::{Path, PathBuf};
use std::{env, fs, thread, time::Duration};

use cadenza::config::Settings;
use cadenza::library::{LibraryIndex, cache};
use cadenza::player::RodioPlayer;
use cadenza::session::{ScanEvent, Session};
use cadenza::{PlayerController, logging};

const TICK: Duration = Duration::from_millis(200);

/// `cadenza [ROOT] [TRACK | --resume]`
///
/// Indexes ROOT (default `Music`) and prints the catalog. With a track path
/// (absolute or relative to ROOT) it plays from the queue starting there;
/// `--resume` picks up whatever was playing last time.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = env::args().skip(1);
    let root = PathBuf::from(args.next().unwrap_or("Music".to_string()));
    let target = args.next();

    let settings = Settings::load_or_default();
    if let Err(e) = logging::init(&settings.logging) {
        eprintln!("cadenza: logging disabled: {e}");
    }

    let player = RodioPlayer::spawn()?;
    let mut session = Session::new(&settings, player)?;
    let cache_path = settings.library.resolved_cache_path();

    match cached_index(&root, cache_path.as_deref()) {
        Some(index) => {
            log::info!("using cached library ({} tracks), rescanning", index.len());
            session.adopt(index);
            session.start_rescan()?;
        }
        None => {
            let report = session.open_library(&root)?;
            if report.skipped > 0 {
                println!("skipped {} unreadable files", report.skipped);
            }
            save_cache(&session.library(), cache_path.as_deref());
        }
    }

    print_catalog(&session.library());

    let started = match target.as_deref() {
        None => false,
        Some("--resume") => {
            let last = session.resume_last()?;
            session.resume();
            last.is_some()
        }
        Some(track) => {
            let path = session.track_path(Path::new(track));
            session.play(&path)?;
            true
        }
    };

    loop {
        if let Some(ScanEvent::Finished(report)) = session.poll_rescan() {
            println!(
                "rescan finished: {} tracks, {} skipped",
                report.indexed, report.skipped
            );
            save_cache(&session.library(), cache_path.as_deref());
        }

        if started {
            if let Some(next) = session.tick()? {
                println!("now playing {}", next.display());
            }
            let Some(path) = session.now_playing() else {
                break;
            };
            let pos = session.player().position().as_secs();
            log::trace!("{} at {}:{:02}", path.display(), pos / 60, pos % 60);
        } else if !session.rescan_running() {
            break;
        }

        thread::sleep(TICK);
    }

    session.shutdown();
    Ok(())
}

/// The cached index, if one exists for this root.
fn cached_index(root: &Path, cache_path: Option<&Path>) -> Option<LibraryIndex> {
    let root = fs::canonicalize(root).ok()?;
    match cache::load(cache_path?) {
        Ok(index) if index.root() == root => Some(index),
        Ok(_) => None,
        Err(e) => {
            log::debug!("no usable library cache: {e}");
            None
        }
    }
}

fn save_cache(index: &LibraryIndex, cache_path: Option<&Path>) {
    let Some(path) = cache_path else {
        return;
    };
    if let Err(e) = cache::save(index, path) {
        log::warn!("failed to save library cache: {e}");
    }
}

fn print_catalog(index: &LibraryIndex) {
    println!("{} ({} tracks)", index.root().display(), index.len());
    for genre in index.genres() {
        println!("{genre}");
        for artist in index.artists(&genre) {
            println!("  {artist}");
            for album in index.albums(&genre, &artist) {
                let tracks = index.album_tracks(&genre, &artist, &album);
                println!("    {album} ({})", tracks.len());
            }
        }
    }
}
