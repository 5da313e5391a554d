use domain::{Chain, TxDirection};
use explorer::TransactionDetail;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    pub direction: TxDirection,
    /// Main-unit amount, never negative; direction carries the sign.
    pub amount: f64,
}

/// Determine direction and magnitude of one transaction relative to the
/// subject address. Pure given its inputs.
pub fn classify(chain: Chain, detail: &TransactionDetail, subject: &str) -> Classification {
    if chain.is_account_style() {
        classify_account(chain, detail, subject)
    } else {
        classify_utxo(chain, detail, subject)
    }
}

fn classify_utxo(chain: Chain, detail: &TransactionDetail, subject: &str) -> Classification {
    let input_sum: f64 = detail
        .inputs
        .iter()
        .filter(|slot| slot.spending_address.as_deref() == Some(subject))
        .map(|slot| slot.value)
        .sum();
    let output_sum: f64 = detail
        .outputs
        .iter()
        .filter(|slot| slot.recipient.as_deref() == Some(subject))
        .map(|slot| slot.value)
        .sum();

    let (direction, raw) = if input_sum > 0.0 && output_sum == 0.0 {
        (TxDirection::Send, input_sum)
    } else if input_sum == 0.0 && output_sum > 0.0 {
        (TxDirection::Receive, output_sum)
    } else if input_sum > 0.0 && output_sum > 0.0 {
        // Change or self-transfer: report the single netted leg.
        let net = output_sum - input_sum;
        if net > 0.0 {
            (TxDirection::Receive, net)
        } else {
            (TxDirection::Send, net.abs())
        }
    } else {
        // Address appears in neither role; indeterminate, don't guess.
        (TxDirection::Unknown, 0.0)
    };

    Classification {
        direction,
        amount: chain.to_main_unit(raw),
    }
}

fn classify_account(chain: Chain, detail: &TransactionDetail, subject: &str) -> Classification {
    // Account addresses are case-insensitive hex; fold before comparing.
    let subject = subject.to_lowercase();
    let sender = detail
        .transaction
        .sender
        .as_deref()
        .map(str::to_lowercase)
        .unwrap_or_default();
    let recipient = detail
        .transaction
        .recipient
        .as_deref()
        .map(str::to_lowercase)
        .unwrap_or_default();

    // Sender checked first: a degenerate self-send classifies as send.
    let direction = if sender == subject {
        TxDirection::Send
    } else if recipient == subject {
        TxDirection::Receive
    } else {
        TxDirection::Unknown
    };

    let amount = if direction == TxDirection::Unknown {
        0.0
    } else {
        chain.to_main_unit(detail.transaction.value)
    };

    Classification { direction, amount }
}

#[cfg(test)]
mod tests {
    use super::*;
    use explorer::{TransactionSummary, TxSlot};

    const SUBJECT: &str = "1SubjectAddressXXXXXXXXXXXXXXXXXX";
    const OTHER: &str = "1SomeOtherAddressXXXXXXXXXXXXXXXX";

    fn input(address: &str, value: f64) -> TxSlot {
        TxSlot {
            spending_address: Some(address.to_string()),
            recipient: None,
            value,
        }
    }

    fn output(address: &str, value: f64) -> TxSlot {
        TxSlot {
            spending_address: None,
            recipient: Some(address.to_string()),
            value,
        }
    }

    fn utxo_detail(inputs: Vec<TxSlot>, outputs: Vec<TxSlot>) -> TransactionDetail {
        TransactionDetail {
            transaction: TransactionSummary::default(),
            inputs,
            outputs,
        }
    }

    fn account_detail(sender: &str, recipient: &str, value: f64) -> TransactionDetail {
        TransactionDetail {
            transaction: TransactionSummary {
                sender: Some(sender.to_string()),
                recipient: Some(recipient.to_string()),
                value,
                time: None,
                block_id: None,
            },
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }

    #[test]
    fn utxo_pure_spend_is_send_of_input_sum() {
        let detail = utxo_detail(vec![input(SUBJECT, 5.0)], vec![output(OTHER, 4.0)]);
        let class = classify(Chain::Bitcoin, &detail, SUBJECT);
        assert_eq!(class.direction, TxDirection::Send);
        assert_eq!(class.amount, 5.0 / 1e8);
    }

    #[test]
    fn utxo_pure_receive_sums_matching_outputs() {
        let detail = utxo_detail(
            vec![input(OTHER, 90_000_000.0)],
            vec![output(SUBJECT, 60_000_000.0), output(SUBJECT, 40_000_000.0)],
        );
        let class = classify(Chain::Litecoin, &detail, SUBJECT);
        assert_eq!(class.direction, TxDirection::Receive);
        assert_eq!(class.amount, 1.0);
    }

    #[test]
    fn utxo_self_transfer_nets_to_single_leg() {
        // Spend 1.0, get 0.3 back as change: net send of 0.7.
        let detail = utxo_detail(
            vec![input(SUBJECT, 100_000_000.0)],
            vec![output(SUBJECT, 30_000_000.0), output(OTHER, 70_000_000.0)],
        );
        let class = classify(Chain::Bitcoin, &detail, SUBJECT);
        assert_eq!(class.direction, TxDirection::Send);
        assert!((class.amount - 0.7).abs() < 1e-9);

        // Net in favor of the subject flips to receive.
        let detail = utxo_detail(
            vec![input(SUBJECT, 10_000_000.0)],
            vec![output(SUBJECT, 50_000_000.0)],
        );
        let class = classify(Chain::Bitcoin, &detail, SUBJECT);
        assert_eq!(class.direction, TxDirection::Receive);
        assert!((class.amount - 0.4).abs() < 1e-9);
    }

    #[test]
    fn utxo_unrelated_transaction_is_unknown() {
        let detail = utxo_detail(vec![input(OTHER, 10.0)], vec![output(OTHER, 9.0)]);
        let class = classify(Chain::Dogecoin, &detail, SUBJECT);
        assert_eq!(class.direction, TxDirection::Unknown);
        assert_eq!(class.amount, 0.0);
    }

    #[test]
    fn account_sender_match_is_send() {
        let subject = format!("0x{}", "ab".repeat(20));
        let detail = account_detail(&subject, &format!("0x{}", "cd".repeat(20)), 2e18);
        let class = classify(Chain::Ethereum, &detail, &subject);
        assert_eq!(class.direction, TxDirection::Send);
        assert_eq!(class.amount, 2.0);
    }

    #[test]
    fn account_comparison_folds_case() {
        let subject = format!("0x{}", "AB".repeat(20));
        let detail = account_detail(
            &format!("0x{}", "cd".repeat(20)),
            &subject.to_lowercase(),
            15e17,
        );
        let class = classify(Chain::Ethereum, &detail, &subject);
        assert_eq!(class.direction, TxDirection::Receive);
        assert_eq!(class.amount, 1.5);
    }

    #[test]
    fn account_self_send_classifies_as_send() {
        let subject = format!("0x{}", "ab".repeat(20));
        let detail = account_detail(&subject, &subject, 1e18);
        let class = classify(Chain::Ethereum, &detail, &subject);
        assert_eq!(class.direction, TxDirection::Send);
        assert_eq!(class.amount, 1.0);
    }

    #[test]
    fn account_bystander_is_unknown_with_zero_amount() {
        let subject = format!("0x{}", "ab".repeat(20));
        let detail = account_detail(
            &format!("0x{}", "cd".repeat(20)),
            &format!("0x{}", "ef".repeat(20)),
            9e18,
        );
        let class = classify(Chain::Ethereum, &detail, &subject);
        assert_eq!(class.direction, TxDirection::Unknown);
        assert_eq!(class.amount, 0.0);
    }
}
