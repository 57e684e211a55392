//! Deterministic quad generation for benchmarks.

use rand::distributions::Alphanumeric;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tristore_core::model::{Iri, Quad, Value};

/// Scale factor for benchmark data generation.
#[derive(Clone, Copy, Debug, Default)]
pub enum Scale {
    /// 100 subjects. Use for quick iteration.
    Tiny,
    /// 1,000 subjects.
    Small,
    /// 10,000 subjects.
    #[default]
    Medium,
    /// 100,000 subjects.
    Large,
}

impl Scale {
    /// Number of distinct subjects at this scale.
    pub fn subjects(&self) -> usize {
        match self {
            Scale::Tiny => 100,
            Scale::Small => 1_000,
            Scale::Medium => 10_000,
            Scale::Large => 100_000,
        }
    }
}

/// Predicates with the fraction of subjects that carry them.
///
/// The spread makes the join order matter: `rare` is on one subject in fifty.
pub const PREDICATES: [(&str, f64); 5] = [
    ("urn:bench:type", 1.0),
    ("urn:bench:name", 0.9),
    ("urn:bench:age", 0.6),
    ("urn:bench:email", 0.3),
    ("urn:bench:rare", 0.02),
];

/// Graphs quads are spread over. `None` is the default graph.
const GRAPHS: [Option<&str>; 3] = [None, Some("urn:bench:graph:a"), Some("urn:bench:graph:b")];

pub fn predicate(name: &str) -> Iri {
    Iri::from(format!("urn:bench:{}", name))
}

pub fn subject(index: usize) -> Iri {
    Iri::from(format!("urn:bench:subject:{:06}", index))
}

fn random_string(rng: &mut StdRng, len: usize) -> String {
    (0..len).map(|_| rng.sample(Alphanumeric) as char).collect()
}

fn object_for(rng: &mut StdRng, predicate: &str, index: usize) -> Value {
    match predicate {
        "urn:bench:type" => Value::iri(format!("urn:bench:Class{}", index % 8)),
        "urn:bench:age" => Value::integer(18 + (rng.gen::<u32>() % 60) as i64),
        "urn:bench:rare" => Value::boolean(rng.gen_bool(0.5)),
        _ => Value::string(random_string(rng, 12)),
    }
}

/// Generate quads for `scale` subjects with a fixed seed.
pub fn generate_quads(scale: Scale) -> Vec<Quad> {
    const SEED: u64 = 12345;
    let mut rng = StdRng::seed_from_u64(SEED);

    let mut quads = Vec::new();
    for index in 0..scale.subjects() {
        let s = subject(index);
        for (p, coverage) in PREDICATES {
            if !rng.gen_bool(coverage) {
                continue;
            }
            let object = object_for(&mut rng, p, index);
            let mut quad = Quad::new(s.clone(), p, object);
            if let Some(graph) = GRAPHS[index % GRAPHS.len()] {
                quad = quad.in_context(graph);
            }
            quads.push(quad);
        }
    }
    quads
}
