use anyhow::Result;

use storefront_bot::dialogue::{validate_email, Session, ShopDialogueState, DEFAULT_QUANTITY};
use storefront_bot::models::Product;

fn salmon() -> Product {
    Product {
        id: 1,
        document_id: "p1".to_string(),
        title: "Salmon".to_string(),
        price: 500.0,
        description: None,
        image: None,
    }
}

/// Integration test for checkout email validation
#[tokio::test]
async fn test_email_dialogue_validation() -> Result<()> {
    // Test valid emails
    assert_eq!(validate_email("  buyer@example.com ").unwrap(), "buyer@example.com");
    assert!(validate_email("first.last-2@shop.example.org").is_ok());

    // Test invalid emails
    assert!(validate_email("").is_err());
    assert!(validate_email("   ").is_err());
    assert!(validate_email("buyer@").is_err());
    assert!(validate_email("@example.com").is_err());
    assert!(validate_email("buyer example.com").is_err());
    assert!(validate_email("buyer@..com").is_err());
    assert!(validate_email("buyer@-.com").is_err());

    Ok(())
}

/// Test dialogue state serialization
#[tokio::test]
async fn test_dialogue_state_serialization() -> Result<()> {
    // Dialogue states must survive a serde_json round trip for persistent storages
    let state = ShopDialogueState::AwaitingEmail {
        session: Session {
            product_id: Some(1),
            quantity: 5,
            ..Session::with_products(vec![salmon()])
        },
    };

    let encoded = serde_json::to_string(&state)?;
    let decoded: ShopDialogueState = serde_json::from_str(&encoded)?;

    match decoded {
        ShopDialogueState::AwaitingEmail { session } => {
            assert_eq!(session.products.len(), 1);
            assert_eq!(session.product(1).map(|p| p.title.as_str()), Some("Salmon"));
            assert_eq!(session.quantity, 5);
        }
        _ => panic!("Unexpected dialogue state"),
    }

    Ok(())
}

/// Test basic dialogue functionality
#[tokio::test]
async fn test_dialogue_functionality() -> Result<()> {
    // Test default trait
    let default_state = ShopDialogueState::default();
    assert!(matches!(default_state, ShopDialogueState::Start));

    // Replacing the product list keeps the rest of the session
    let mut session = Session::with_products(vec![salmon()]);
    session.quantity = 10;
    session.replace_products(vec![]);
    assert!(session.products.is_empty());
    assert_eq!(session.quantity, 10);
    assert_eq!(Session::default().quantity, DEFAULT_QUANTITY);

    Ok(())
}
