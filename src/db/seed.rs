use sqlx::SqlitePool;

use crate::{
    db::{accounts, medicines, models::NewMedicine},
    error::AppError,
    services,
};

#[allow(clippy::too_many_arguments)]
fn medicine(
    name: &str,
    category: &str,
    description: &str,
    dosage: &str,
    side_effects: &str,
    manufacturer: &str,
    price_cents: i64,
    stock: i64,
    requires_prescription: bool,
) -> NewMedicine {
    NewMedicine {
        name: name.to_string(),
        category: category.to_string(),
        description: description.to_string(),
        price_cents,
        stock,
        requires_prescription,
        dosage: Some(dosage.to_string()),
        side_effects: Some(side_effects.to_string()),
        manufacturer: Some(manufacturer.to_string()),
        image_url: None,
    }
}

fn get_seed_medicines() -> Vec<NewMedicine> {
    vec![
        medicine(
            "Paracetamol 500mg",
            "Analgesic",
            "Effective pain reliever and fever reducer. Used for headaches, muscle aches, arthritis, backache, toothaches, colds, and fevers.",
            "1-2 tablets every 4-6 hours as needed",
            "Rare: nausea, stomach pain, loss of appetite",
            "PharmaCorp Ltd.",
            250_000,
            50,
            false,
        ),
        medicine(
            "Amoxicillin 250mg",
            "Antibiotic",
            "Broad-spectrum antibiotic used to treat various bacterial infections including respiratory, ear, nose, throat, urinary tract, and skin infections.",
            "As prescribed by physician, typically 250-500mg every 8 hours",
            "Nausea, vomiting, diarrhea, rash",
            "MediPharm International",
            1_300_000,
            30,
            true,
        ),
        medicine(
            "Omeprazole 20mg",
            "Digestive",
            "Proton pump inhibitor used to treat gastroesophageal reflux disease (GERD), stomach ulcers, and other conditions involving excessive stomach acid.",
            "20mg once daily before meals",
            "Headache, nausea, diarrhea, stomach pain",
            "HealthCare Solutions",
            800_000,
            25,
            false,
        ),
        medicine(
            "Cetirizine 10mg",
            "Antihistamine",
            "Antihistamine used to relieve allergy symptoms such as watery eyes, runny nose, itching eyes/nose, sneezing, hives, and itching.",
            "10mg once daily",
            "Drowsiness, dry mouth, fatigue",
            "AllergyRelief Inc.",
            350_000,
            40,
            false,
        ),
        medicine(
            "Metformin 500mg",
            "Antidiabetic",
            "First-line medication for type 2 diabetes. Helps control blood sugar levels by improving insulin sensitivity.",
            "As prescribed, typically 500mg twice daily with meals",
            "Nausea, diarrhea, stomach upset",
            "DiabetesCare Pharma",
            1_500_000,
            20,
            true,
        ),
        medicine(
            "Ibuprofen 400mg",
            "Analgesic",
            "Nonsteroidal anti-inflammatory drug (NSAID) used to reduce fever and treat pain or inflammation.",
            "400mg every 4-6 hours as needed",
            "Upset stomach, mild heartburn, nausea",
            "PainRelief Pharmaceuticals",
            400_000,
            35,
            false,
        ),
        medicine(
            "Ciprofloxacin 500mg",
            "Antibiotic",
            "Fluoroquinolone antibiotic used to treat various bacterial infections including urinary tract infections, respiratory infections, and skin infections.",
            "As prescribed by physician",
            "Nausea, diarrhea, dizziness, headache",
            "Advanced Antibiotics Ltd.",
            1_800_000,
            15,
            true,
        ),
        medicine(
            "Vitamin D3 1000IU",
            "Supplement",
            "Essential vitamin supplement for bone health, immune function, and overall wellness.",
            "1 tablet daily with food",
            "Rare: nausea, constipation",
            "VitaHealth Supplements",
            600_000,
            45,
            false,
        ),
    ]
}

/// Seeds the admin account and sample catalog. Does nothing if either table already
/// has rows. Returns whether anything was written.
pub async fn seed_database(
    pool: &SqlitePool,
    admin_email: &str,
    admin_password: &str,
) -> Result<bool, AppError> {
    let users = accounts::count_users(pool).await?;
    let catalog: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM medicines")
        .fetch_one(pool)
        .await?;
    if users > 0 || catalog > 0 {
        log::info!("Database already seeded; skipping");
        return Ok(false);
    }

    let admin = services::accounts::new_admin(admin_email, admin_password)?;

    // Admin and catalog commit together or not at all.
    let mut tx = pool.begin().await?;
    accounts::create_user(&mut *tx, &admin).await?;
    for new in get_seed_medicines() {
        medicines::create_medicine(&mut *tx, &new).await?;
    }
    tx.commit().await?;

    log::info!("Database seeded; admin account is {}", admin_email);
    Ok(true)
}
