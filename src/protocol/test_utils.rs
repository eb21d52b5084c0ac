macro_rules! test_roundtrip {
    ($t:ty, $name:ident) => {
        proptest::proptest! {
            #![proptest_config(proptest::prelude::ProptestConfig{fork: false, ..Default::default()})]
            #[test]
            fn $name(orig: $t) {
                use std::io::Cursor;

                use crate::protocol::traits::{ReadType, WriteType};

                let mut buf = Cursor::new(Vec::<u8>::new());
                match orig.write(&mut buf) {
                    Err(_) => {
                        // skip, e.g. a generated string longer than an INT16 length
                    }
                    Ok(()) => {
                        let len = buf.position();
                        buf.set_position(0);

                        let restored = <$t>::read(&mut buf).unwrap();
                        assert_eq!(orig, restored);

                        // the reader must consume exactly what the writer produced
                        assert_eq!(buf.position(), len);
                    }
                }
            }
        }
    };
}

pub(crate) use test_roundtrip;
