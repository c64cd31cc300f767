use approx::assert_abs_diff_eq;
use boardwatch::board::{Placement, SquareMapper};
use boardwatch::core::{homography_from_4pt, GrayImage, Homography, Point2};
use boardwatch::moves::MoveClass;
use boardwatch::{
    CornerIds, Frame, MarkerObservation, Orientation, PieceMap, Square, StabilizerParams,
    TrackerConfig,
};

const SCENE_FRAMES: u64 = 30;
const FPS: f64 = 30.0;
const CORNERS: CornerIds = CornerIds([900, 901, 902, 903]);
const FIRST_PIECE_TAG: u32 = 10;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn sq(label: &str) -> Square {
    label.parse().unwrap()
}

/// Camera view of the board: a slightly skewed quad.
struct Camera {
    image_from_board: Homography,
    mapper: SquareMapper,
}

impl Camera {
    const QUAD: [(f32, f32); 4] = [(100.0, 80.0), (520.0, 95.0), (540.0, 470.0), (90.0, 450.0)];

    fn new() -> Self {
        let board = [
            Point2::new(0.0, 0.0),
            Point2::new(900.0, 0.0),
            Point2::new(900.0, 900.0),
            Point2::new(0.0, 900.0),
        ];
        let image = Self::QUAD.map(|(x, y)| Point2::new(x, y));
        Self {
            image_from_board: homography_from_4pt(&board, &image).unwrap(),
            mapper: SquareMapper::new(900, Orientation::WhiteAtBottom),
        }
    }

    fn corners(&self) -> Vec<MarkerObservation> {
        CORNERS
            .0
            .iter()
            .zip(Self::QUAD)
            .map(|(&id, (x, y))| MarkerObservation::new(id, x, y))
            .collect()
    }

    fn pieces(&self, placement: &Placement) -> Vec<MarkerObservation> {
        placement
            .iter()
            .map(|(&square, &tag)| {
                let (x, y) = self.mapper.square_to_center(square);
                let p = self.image_from_board.apply(Point2::new(x, y));
                MarkerObservation::new(tag, p.x, p.y)
            })
            .collect()
    }

    fn view(&self, placement: &Placement, with_corners: bool) -> Vec<MarkerObservation> {
        let mut obs = if with_corners {
            self.corners()
        } else {
            Vec::new()
        };
        obs.extend(self.pieces(placement));
        obs
    }
}

fn piece_map() -> PieceMap {
    PieceMap::sequential(FIRST_PIECE_TAG).unwrap()
}

/// Standard start with each tag on its labelled piece's square.
fn start_placement() -> Placement {
    let map = piece_map();
    let back = ["R1", "N1", "B1", "Q", "K", "B2", "N2", "R2"];
    let mut placement = Placement::new();
    for (file, &piece) in back.iter().enumerate() {
        let file = file as u8;
        let white = map.tag_for(&format!("w{piece}")).unwrap();
        let black = map.tag_for(&format!("b{piece}")).unwrap();
        placement.insert(Square::new(file, 0).unwrap(), white);
        placement.insert(Square::new(file, 7).unwrap(), black);
        let pawn = file + 1;
        placement.insert(
            Square::new(file, 1).unwrap(),
            map.tag_for(&format!("wP{pawn}")).unwrap(),
        );
        placement.insert(
            Square::new(file, 6).unwrap(),
            map.tag_for(&format!("bP{pawn}")).unwrap(),
        );
    }
    placement
}

fn moved(placement: &Placement, from: &str, to: &str) -> Placement {
    let mut next = placement.clone();
    let tag = next.remove(&sq(from)).unwrap();
    next.insert(sq(to), tag);
    next
}

/// One scene per observed board state, each held still for a second.
/// Scenes alternate between a dark and a bright image so every scene
/// boundary registers as motion.
fn frames(scenes: usize) -> impl Iterator<Item = Frame> {
    (0..scenes as u64 * SCENE_FRAMES).map(|index| {
        let value = if (index / SCENE_FRAMES) % 2 == 0 { 40 } else { 160 };
        Frame::at_rate(GrayImage::filled(32, 32, value), index, FPS)
    })
}

fn params() -> StabilizerParams {
    StabilizerParams {
        fps: FPS,
        ..StabilizerParams::default()
    }
}

fn scripted(scenes: Vec<Vec<MarkerObservation>>) -> impl Fn(&Frame) -> Vec<MarkerObservation> {
    move |frame: &Frame| {
        let scene = (frame.index / SCENE_FRAMES) as usize;
        scenes.get(scene).cloned().unwrap_or_default()
    }
}

fn config() -> TrackerConfig {
    let mut config = TrackerConfig::new(CORNERS);
    config.piece_map = Some(piece_map());
    config
}

#[test]
fn opening_moves_are_recovered_from_frames() {
    init_logging();
    let camera = Camera::new();
    let start = start_placement();
    let e4 = moved(&start, "e2", "e4");
    let e5 = moved(&e4, "e7", "e5");
    let nf3 = moved(&e5, "g1", "f3");

    let scenes = vec![
        camera.view(&start, true),
        camera.view(&e4, true),
        camera.view(&e4, true),
        camera.view(&e5, true),
        // a hand covers the corners while Nf3 is on the board
        camera.view(&nf3, false),
    ];
    let count = scenes.len();
    let cfg = config();
    let mut tracker = cfg.build_tracker(scripted(scenes)).unwrap();
    let summary = tracker.run(frames(count), &cfg.stabilizer).unwrap();

    assert_eq!(summary.stable_frames, count);
    assert_eq!(summary.skipped_frames, 0);
    assert!(!summary.terminal);
    assert_eq!(summary.record.sans(), vec!["e4", "e5", "Nf3"]);
    assert_eq!(summary.record.to_pgn_movetext(), "1. e4 e5 2. Nf3 *");

    let first = &summary.record.moves[0];
    assert_eq!(first.discrepancy, 0);
    assert_eq!(first.class, MoveClass::Normal);
    assert_eq!(first.mover_label.as_deref(), Some("wP5"));
    // middle of the second scene's quiescent run
    assert_eq!(first.frame_index, SCENE_FRAMES + 15);
    assert_abs_diff_eq!(first.timestamp, 45.0 / FPS, epsilon = 1e-9);

    assert_eq!(tracker.history().len(), count);
    let last = tracker.history().last().unwrap();
    assert_eq!(last.placement, nf3);
}

#[test]
fn frames_before_the_first_calibration_are_skipped() {
    init_logging();
    let camera = Camera::new();
    let start = start_placement();
    let d4 = moved(&start, "d2", "d4");

    let scenes = vec![
        camera.view(&start, false),
        camera.view(&start, true),
        camera.view(&d4, false),
    ];
    let mut tracker = config().build_tracker(scripted(scenes)).unwrap();
    let summary = tracker.run(frames(3), &params()).unwrap();

    assert_eq!(summary.stable_frames, 3);
    assert_eq!(summary.skipped_frames, 1);
    assert_eq!(summary.record.sans(), vec!["d4"]);
}

#[test]
fn tracking_stops_once_the_game_is_over() {
    init_logging();
    let camera = Camera::new();
    let mut boards = vec![start_placement()];
    for (from, to) in [("f2", "f3"), ("e7", "e5"), ("g2", "g4"), ("d8", "h4")] {
        let next = moved(boards.last().unwrap(), from, to);
        boards.push(next);
    }
    // someone knocks a pawn over after the mate
    let mut knocked = boards.last().unwrap().clone();
    knocked.remove(&sq("a2"));
    boards.push(knocked.clone());
    boards.push(start_placement());

    let scenes: Vec<_> = boards.iter().map(|b| camera.view(b, true)).collect();
    let count = scenes.len();
    let mut tracker = config().build_tracker(scripted(scenes)).unwrap();
    let summary = tracker.run(frames(count), &params()).unwrap();

    assert!(summary.terminal);
    assert!(tracker.is_terminal());
    assert_eq!(summary.stable_frames, count - 1);
    assert_eq!(summary.record.sans(), vec!["f3", "e5", "g4", "Qh4#"]);
    assert_eq!(tracker.history().last().unwrap().placement, knocked);
}

#[test]
fn rectified_board_matches_the_canonical_size() {
    let camera = Camera::new();
    let mut calibrator = boardwatch::board::BoardCalibrator::default();
    assert!(calibrator.calibrate_from_observations(&camera.corners(), CORNERS));
    let warped = calibrator.warp(&GrayImage::filled(640, 480, 90)).unwrap();
    assert_eq!((warped.width, warped.height), (900, 900));
    // board interior lies inside the camera image
    assert_eq!(warped.get(450, 450), Some(90));
}
