//! Writes a synthetic passenger list in the Kaggle layout, as
//! `titanic_data.csv` and `titanic_data.parquet`, for trying the explorer
//! without the real data set.

use std::sync::Arc;

use anyhow::Context;
use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use arrow::util::pretty::pretty_format_batches;
use parquet::arrow::ArrowWriter;

const PASSENGERS: usize = 891;
const CSV_PATH: &str = "titanic_data.csv";
const PARQUET_PATH: &str = "titanic_data.parquet";

const FIRST_NAMES: [&str; 8] = [
    "John", "William", "Mary", "Anna", "Thomas", "Elizabeth", "James", "Margaret",
];
const SURNAMES: [&str; 8] = [
    "Smith", "Brown", "Kelly", "Andersson", "Sage", "Johnson", "Carter", "Allison",
];

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5)).rotate_left(7).wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }

    fn below(&mut self, n: usize) -> usize {
        (self.next_u64() % n as u64) as usize
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

/// One generated row, before any cleaning. Gaps are left where the real
/// list has them (age, cabin, port).
struct Row {
    id: i64,
    survived: i64,
    pclass: i64,
    name: String,
    sex: &'static str,
    age: Option<f64>,
    sibsp: i64,
    parch: i64,
    ticket: String,
    fare: f64,
    cabin: Option<String>,
    embarked: Option<&'static str>,
}

fn generate(rng: &mut SimpleRng, id: i64) -> Row {
    let pclass = match rng.next_f64() {
        x if x < 0.24 => 1,
        x if x < 0.45 => 2,
        _ => 3,
    };
    let sex = if rng.chance(0.35) { "female" } else { "male" };

    let survival_rate = match (sex, pclass) {
        ("female", 1) => 0.95,
        ("female", 2) => 0.9,
        ("female", _) => 0.5,
        (_, 1) => 0.37,
        (_, 2) => 0.16,
        _ => 0.14,
    };
    let survived = i64::from(rng.chance(survival_rate));

    let age = (!rng.chance(0.2)).then(|| {
        let mean = [0.0, 38.0, 30.0, 25.0][pclass as usize];
        (rng.gauss(mean, 14.0).clamp(0.42, 80.0) * 2.0).round() / 2.0
    });

    let fare_base = [0.0, 84.0, 20.0, 13.0][pclass as usize];
    let fare = (rng.gauss(fare_base, fare_base * 0.4).max(0.0) * 10_000.0).round() / 10_000.0;

    let sibsp = if rng.chance(0.7) { 0 } else { 1 + rng.below(4) as i64 };
    let parch = if rng.chance(0.75) { 0 } else { 1 + rng.below(3) as i64 };

    let cabin = (pclass == 1 && !rng.chance(0.2)).then(|| {
        let deck = ["A", "B", "C", "D", "E"][rng.below(5)];
        format!("{deck}{}", 1 + rng.below(120))
    });

    let embarked = match rng.next_f64() {
        x if x < 0.003 => None,
        x if x < 0.19 => Some("C"),
        x if x < 0.28 => Some("Q"),
        _ => Some("S"),
    };

    let title = match (sex, age) {
        ("male", Some(a)) if a < 13.0 => "Master.",
        ("male", _) => "Mr.",
        (_, Some(a)) if a < 18.0 => "Miss.",
        _ => "Mrs.",
    };
    let name = format!(
        "{}, {title} {}",
        SURNAMES[rng.below(SURNAMES.len())],
        FIRST_NAMES[rng.below(FIRST_NAMES.len())]
    );

    Row {
        id,
        survived,
        pclass,
        name,
        sex,
        age,
        sibsp,
        parch,
        ticket: format!("{}", 100_000 + rng.below(300_000)),
        fare,
        cabin,
        embarked,
    }
}

fn write_csv(rows: &[Row]) -> anyhow::Result<()> {
    let mut writer = csv::Writer::from_path(CSV_PATH).context("creating csv file")?;
    writer.write_record([
        "PassengerId", "Survived", "Pclass", "Name", "Sex", "Age", "SibSp", "Parch", "Ticket",
        "Fare", "Cabin", "Embarked",
    ])?;
    for r in rows {
        writer.write_record([
            r.id.to_string(),
            r.survived.to_string(),
            r.pclass.to_string(),
            r.name.clone(),
            r.sex.to_string(),
            r.age.map(|a| a.to_string()).unwrap_or_default(),
            r.sibsp.to_string(),
            r.parch.to_string(),
            r.ticket.clone(),
            r.fare.to_string(),
            r.cabin.clone().unwrap_or_default(),
            r.embarked.unwrap_or_default().to_string(),
        ])?;
    }
    writer.flush().context("flushing csv file")?;
    Ok(())
}

fn to_batch(rows: &[Row]) -> anyhow::Result<RecordBatch> {
    let int = |f: fn(&Row) -> i64| -> ArrayRef {
        Arc::new(Int64Array::from(rows.iter().map(f).collect::<Vec<_>>()))
    };

    let schema = Arc::new(Schema::new(vec![
        Field::new("PassengerId", DataType::Int64, false),
        Field::new("Survived", DataType::Int64, false),
        Field::new("Pclass", DataType::Int64, false),
        Field::new("Name", DataType::Utf8, false),
        Field::new("Sex", DataType::Utf8, false),
        Field::new("Age", DataType::Float64, true),
        Field::new("SibSp", DataType::Int64, false),
        Field::new("Parch", DataType::Int64, false),
        Field::new("Ticket", DataType::Utf8, false),
        Field::new("Fare", DataType::Float64, false),
        Field::new("Cabin", DataType::Utf8, true),
        Field::new("Embarked", DataType::Utf8, true),
    ]));

    let columns: Vec<ArrayRef> = vec![
        int(|r| r.id),
        int(|r| r.survived),
        int(|r| r.pclass),
        Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.name.as_str()))),
        Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.sex))),
        Arc::new(rows.iter().map(|r| r.age).collect::<Float64Array>()),
        int(|r| r.sibsp),
        int(|r| r.parch),
        Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.ticket.as_str()))),
        Arc::new(Float64Array::from_iter_values(rows.iter().map(|r| r.fare))),
        Arc::new(rows.iter().map(|r| r.cabin.as_deref()).collect::<StringArray>()),
        Arc::new(rows.iter().map(|r| r.embarked).collect::<StringArray>()),
    ];

    RecordBatch::try_new(schema, columns).context("building record batch")
}

fn write_parquet(batch: &RecordBatch) -> anyhow::Result<()> {
    let file = std::fs::File::create(PARQUET_PATH).context("creating parquet file")?;
    let mut writer =
        ArrowWriter::try_new(file, batch.schema(), None).context("creating parquet writer")?;
    writer.write(batch).context("writing record batch")?;
    writer.close().context("closing parquet writer")?;
    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let mut rng = SimpleRng::new(42);

    let rows: Vec<Row> = (1..=PASSENGERS as i64).map(|id| generate(&mut rng, id)).collect();

    write_csv(&rows)?;
    let batch = to_batch(&rows)?;
    write_parquet(&batch)?;

    log::info!("First rows:\n{}", pretty_format_batches(&[batch.slice(0, 5)])?);
    println!("Wrote {} passengers to {CSV_PATH} and {PARQUET_PATH}", rows.len());
    Ok(())
}
